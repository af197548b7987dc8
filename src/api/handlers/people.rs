use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::helpers::{
    check_not_null, check_opt_one_of, created, fetch_by_id, ok_true, opt_f64, opt_str, parse_body,
    required_str, update_row, Filters, Patch, Query,
};
use crate::api::state::AppState;
use crate::db::query_json;

pub const ROLES: [&str; 5] = ["editor", "fixer", "producer", "camera", "other"];

const EDITABLE: [&str; 10] = [
    "name",
    "role",
    "email",
    "phone",
    "rate_per_day",
    "currency",
    "location",
    "instagram",
    "notes",
    "active",
];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/people", get(list).post(create))
        .route("/api/people/:id", get(read).put(update).delete(deactivate))
}

async fn list(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let mut filters = Filters::new();
    filters.push("p.active = ?", 1);
    filters.from_query(&query, "role", "p.role = ?");

    let sql = format!(
        "SELECT p.*,
            COUNT(DISTINCT e.id) AS episode_count,
            COUNT(DISTINCT s.id) AS series_count
         FROM people p
         LEFT JOIN episodes e ON p.id = e.editor_id
         LEFT JOIN series s ON p.id = s.fixer_id OR p.id = s.producer_id OR p.id = s.camera_id
         {}
         GROUP BY p.id
         ORDER BY p.name",
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
    let name = required_str(&body, "name")?;
    check_opt_one_of(&body, "role", &ROLES)?;

    let conn = state.db()?;
    conn.execute(
        "INSERT INTO people(name, role, email, phone, rate_per_day, currency, location, instagram, notes)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            name,
            opt_str(&body, "role").unwrap_or_else(|| "other".into()),
            opt_str(&body, "email").unwrap_or_default(),
            opt_str(&body, "phone").unwrap_or_default(),
            opt_f64(&body, "rate_per_day").unwrap_or(0.0),
            opt_str(&body, "currency").unwrap_or_else(|| "USD".into()),
            opt_str(&body, "location").unwrap_or_default(),
            opt_str(&body, "instagram").unwrap_or_default(),
            opt_str(&body, "notes").unwrap_or_default(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(person_id = id, "person created");
    Ok(created(fetch_by_id(&conn, "SELECT * FROM people WHERE id = ?", id, "Person")?))
}

async fn read(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    Ok(Json(fetch_by_id(&conn, "SELECT * FROM people WHERE id = ?", id, "Person")?))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["name"])?;
    check_opt_one_of(&body, "role", &ROLES)?;
    let patch = Patch::from_body(&body, &EDITABLE);
    patch.require_fields()?;

    let conn = state.db()?;
    let row = update_row(&conn, "people", id, patch, "Person")?;
    info!(person_id = id, "person updated");
    Ok(Json(row))
}

/// People are referenced by series and episodes, so removal only hides them.
async fn deactivate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    if conn.execute("UPDATE people SET active = 0 WHERE id = ?", [id])? == 0 {
        return Err(ApiError::not_found("Person"));
    }
    info!(person_id = id, "person deactivated");
    Ok(ok_true())
}
