use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::helpers::{
    check_not_null, check_opt_one_of, created, fetch_by_id, ok_true, opt_i64, opt_str, parse_body,
    update_row, Filters, Patch, Query,
};
use crate::api::state::AppState;
use crate::db::query_json;

const CONTACT_TYPES: [&str; 5] = ["fixer", "hotel", "creator", "talent", "other"];
const CONTACT_STAGES: [&str; 5] = ["cold", "contacted", "responded", "confirmed", "passed"];

const EDITABLE: [&str; 11] = [
    "name",
    "destination",
    "type",
    "stage",
    "wa",
    "email",
    "instagram",
    "website",
    "notes",
    "source",
    "priority",
];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/field-contacts", get(list).post(create))
        .route("/api/field-contacts/:id", patch(update).delete(remove))
}

async fn list(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let mut filters = Filters::new();
    filters.from_query(&query, "destination", "destination = ?");
    // Unknown type/stage values are ignored rather than matching nothing.
    if let Some(t) = query.get("type").filter(|t| CONTACT_TYPES.contains(&t.as_str())) {
        filters.push("type = ?", t.clone());
    }
    if let Some(s) = query.get("stage").filter(|s| CONTACT_STAGES.contains(&s.as_str())) {
        filters.push("stage = ?", s.clone());
    }
    let sql = format!(
        "SELECT * FROM field_contacts{} ORDER BY updated_at DESC, created_at DESC",
        filters.where_sql()
    );
    let conn = state.db()?;
    Ok(Json(Value::Array(query_json(&conn, &sql, filters.params())?)))
}

async fn create(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    let name = opt_str(&body, "name").map(|s| s.trim().to_string()).unwrap_or_default();
    let destination = opt_str(&body, "destination")
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if name.is_empty() || destination.is_empty() {
        return Err(ApiError::bad_request("Name and destination are required"));
    }
    check_opt_one_of(&body, "type", &CONTACT_TYPES)?;
    check_opt_one_of(&body, "stage", &CONTACT_STAGES)?;

    let id = Uuid::new_v4().to_string();
    let optional = |key: &str| opt_str(&body, key).filter(|s| !s.is_empty());
    let conn = state.db()?;
    conn.execute(
        "INSERT INTO field_contacts(
            id, name, destination, type, stage, wa, email, instagram, website, notes, source, priority
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            name,
            destination,
            opt_str(&body, "type").unwrap_or_else(|| "other".into()),
            opt_str(&body, "stage").unwrap_or_else(|| "cold".into()),
            optional("wa"),
            optional("email"),
            optional("instagram"),
            optional("website"),
            optional("notes"),
            optional("source"),
            opt_i64(&body, "priority").unwrap_or(2).clamp(1, 3),
        ],
    )?;
    info!(contact_id = %id, %destination, "field contact created");
    Ok(created(fetch_by_id(
        &conn,
        "SELECT * FROM field_contacts WHERE id = ?",
        id,
        "Contact",
    )?))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["name", "destination", "priority"])?;
    check_opt_one_of(&body, "type", &CONTACT_TYPES)?;
    check_opt_one_of(&body, "stage", &CONTACT_STAGES)?;
    let mut patch = Patch::from_body(&body, &EDITABLE);
    patch.require_fields()?;
    if let Some(p) = opt_i64(&body, "priority") {
        patch.set("priority", p.clamp(1, 3));
    }
    patch.touch("updated_at");

    let conn = state.db()?;
    let row = update_row(&conn, "field_contacts", id.clone(), patch, "Contact")?;
    info!(contact_id = %id, "field contact updated");
    Ok(Json(row))
}

async fn remove(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let removed = conn.execute("DELETE FROM field_contacts WHERE id = ?", [&id])?;
    info!(contact_id = %id, removed, "field contact deleted");
    Ok(ok_true())
}
