//! Hiring pipeline: open positions and the applicants moving through them.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use rusqlite::Connection;
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::helpers::{
    check_not_null, check_one_of, check_opt_one_of, created, fetch_by_id, opt_str, parse_body,
    required_i64, required_str, Filters, Patch, Query,
};
use crate::api::state::AppState;
use crate::db::query_json;

pub const APPLICANT_STAGES: [&str; 7] = [
    "applied",
    "contacted",
    "trial_sent",
    "evaluation",
    "interview",
    "hired",
    "rejected",
];

const POSITION_EDITABLE: [&str; 9] = [
    "title",
    "role_type",
    "status",
    "description",
    "requirements",
    "rate_range",
    "location_preference",
    "job_board_urls",
    "trial_task_doc_url",
];

const APPLICANT_EDITABLE: [&str; 12] = [
    "position_id",
    "name",
    "email",
    "phone",
    "source",
    "portfolio_url",
    "resume_url",
    "notes",
    "stage",
    "trial_task_sent_at",
    "interview_date",
    "rejection_reason",
];

const APPLICANT_SELECT: &str = "
    SELECT a.*, jp.title AS position_title, jp.role_type
    FROM applicants a
    LEFT JOIN job_positions jp ON a.position_id = jp.id";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/hiring/positions", get(list_positions).post(create_position))
        .route(
            "/api/hiring/positions/:id",
            get(read_position).put(update_position).delete(remove_position),
        )
        .route(
            "/api/hiring/applicants",
            get(list_applicants).post(create_applicant),
        )
        .route(
            "/api/hiring/applicants/:id",
            get(read_applicant)
                .put(update_applicant)
                .delete(remove_applicant),
        )
        .route("/api/hiring/applicants/:id/move", put(move_applicant))
}

fn log_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: i64,
    action: &str,
    details: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO activity_log(action, details, entity_type, entity_id) VALUES (?, ?, ?, ?)",
        rusqlite::params![action, details, entity_type, entity_id],
    )?;
    Ok(())
}

fn position_counts_sql() -> String {
    let per_stage = APPLICANT_STAGES
        .iter()
        .map(|s| format!("SUM(CASE WHEN a.stage = '{0}' THEN 1 ELSE 0 END) AS {0}_count", s))
        .collect::<Vec<_>>()
        .join(",\n            ");
    format!(
        "SELECT jp.*,
            COUNT(a.id) AS applicant_count,
            {}
         FROM job_positions jp
         LEFT JOIN applicants a ON jp.id = a.position_id
         GROUP BY jp.id
         ORDER BY jp.created_at DESC, jp.id DESC",
        per_stage
    )
}

fn read_applicant_row(conn: &Connection, id: i64) -> ApiResult<Value> {
    fetch_by_id(conn, &format!("{} WHERE a.id = ?", APPLICANT_SELECT), id, "Applicant")
}

async fn list_positions(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    Ok(Json(Value::Array(query_json(&conn, &position_counts_sql(), [])?)))
}

async fn create_position(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    let title = required_str(&body, "title")?;
    let text = |key: &str| opt_str(&body, key).unwrap_or_default();

    let conn = state.db()?;
    conn.execute(
        "INSERT INTO job_positions(title, role_type, status, description, requirements,
            rate_range, location_preference, job_board_urls, trial_task_doc_url)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            title,
            opt_str(&body, "role_type")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "producer".into()),
            opt_str(&body, "status")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "active".into()),
            text("description"),
            text("requirements"),
            text("rate_range"),
            text("location_preference"),
            text("job_board_urls"),
            text("trial_task_doc_url"),
        ],
    )?;
    let id = conn.last_insert_rowid();
    log_entity(&conn, "job_position", id, "created", &format!("Position: {}", title))?;
    info!(position_id = id, "position created");
    Ok(created(fetch_by_id(
        &conn,
        "SELECT * FROM job_positions WHERE id = ?",
        id,
        "Position",
    )?))
}

async fn read_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    Ok(Json(fetch_by_id(
        &conn,
        "SELECT * FROM job_positions WHERE id = ?",
        id,
        "Position",
    )?))
}

async fn update_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["title"])?;
    let mut patch = Patch::from_body(&body, &POSITION_EDITABLE);
    patch.require_fields()?;
    patch.touch("updated_at");

    let conn = state.db()?;
    if patch.apply(&conn, "job_positions", id)? == 0 {
        return Err(ApiError::not_found("Position"));
    }
    log_entity(&conn, "job_position", id, "updated", "Position updated")?;
    info!(position_id = id, "position updated");
    Ok(Json(fetch_by_id(
        &conn,
        "SELECT * FROM job_positions WHERE id = ?",
        id,
        "Position",
    )?))
}

async fn remove_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    if conn.execute("DELETE FROM job_positions WHERE id = ?", [id])? == 0 {
        return Err(ApiError::not_found("Position"));
    }
    log_entity(&conn, "job_position", id, "deleted", "Position deleted")?;
    info!(position_id = id, "position deleted");
    Ok(Json(json!({ "success": true })))
}

async fn list_applicants(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let mut filters = Filters::new();
    filters.from_query(&query, "position_id", "a.position_id = ?");
    filters.from_query(&query, "stage", "a.stage = ?");
    filters.from_query(&query, "role_type", "jp.role_type = ?");
    let sql = format!(
        "{}{} ORDER BY a.created_at DESC, a.id DESC",
        APPLICANT_SELECT,
        filters.where_sql()
    );
    let conn = state.db()?;
    Ok(Json(Value::Array(query_json(&conn, &sql, filters.params())?)))
}

async fn create_applicant(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    let position_id = required_i64(&body, "position_id")?;
    let name = required_str(&body, "name")?;
    check_opt_one_of(&body, "stage", &APPLICANT_STAGES)?;
    let text = |key: &str| opt_str(&body, key).unwrap_or_default();

    let conn = state.db()?;
    fetch_by_id(
        &conn,
        "SELECT id FROM job_positions WHERE id = ?",
        position_id,
        "Position",
    )?;
    conn.execute(
        "INSERT INTO applicants(position_id, name, email, phone, source, portfolio_url,
            resume_url, notes, stage)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            position_id,
            name,
            text("email"),
            text("phone"),
            text("source"),
            text("portfolio_url"),
            text("resume_url"),
            text("notes"),
            opt_str(&body, "stage").unwrap_or_else(|| "applied".into()),
        ],
    )?;
    let id = conn.last_insert_rowid();
    log_entity(&conn, "applicant", id, "created", &format!("Applicant: {}", name))?;
    info!(applicant_id = id, position_id, "applicant created");
    Ok(created(read_applicant_row(&conn, id)?))
}

async fn read_applicant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    Ok(Json(read_applicant_row(&conn, id)?))
}

async fn update_applicant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["position_id", "name"])?;
    check_opt_one_of(&body, "stage", &APPLICANT_STAGES)?;
    let mut patch = Patch::from_body(&body, &APPLICANT_EDITABLE);
    patch.require_fields()?;
    patch.touch("updated_at");

    let conn = state.db()?;
    if patch.apply(&conn, "applicants", id)? == 0 {
        return Err(ApiError::not_found("Applicant"));
    }
    log_entity(&conn, "applicant", id, "updated", "Applicant updated")?;
    info!(applicant_id = id, "applicant updated");
    Ok(Json(read_applicant_row(&conn, id)?))
}

async fn remove_applicant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    if conn.execute("DELETE FROM applicants WHERE id = ?", [id])? == 0 {
        return Err(ApiError::not_found("Applicant"));
    }
    log_entity(&conn, "applicant", id, "deleted", "Applicant deleted")?;
    info!(applicant_id = id, "applicant deleted");
    Ok(Json(json!({ "success": true })))
}

async fn move_applicant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    let stage = required_str(&body, "stage")?;
    check_one_of("stage", &stage, &APPLICANT_STAGES)?;

    let conn = state.db()?;
    let current = read_applicant_row(&conn, id)?;

    let mut patch = Patch::new();
    patch.set("stage", stage.clone());
    let trial_sent_unset = current
        .get("trial_task_sent_at")
        .and_then(Value::as_str)
        .map_or(true, str::is_empty);
    if stage == "trial_sent" && trial_sent_unset {
        patch.set(
            "trial_task_sent_at",
            Utc::now().date_naive().format("%Y-%m-%d").to_string(),
        );
    }
    if stage == "interview" {
        if let Some(date) = opt_str(&body, "interview_date").filter(|s| !s.is_empty()) {
            patch.set("interview_date", date);
        }
    }
    if stage == "rejected" {
        if let Some(reason) = opt_str(&body, "rejection_reason").filter(|s| !s.is_empty()) {
            patch.set("rejection_reason", reason);
        }
    }
    patch.touch("updated_at");
    patch.apply(&conn, "applicants", id)?;

    log_entity(&conn, "applicant", id, "stage_changed", &format!("Moved to {}", stage))?;
    info!(applicant_id = id, %stage, "applicant moved");
    Ok(Json(read_applicant_row(&conn, id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn position_counts_split_by_stage() {
        let conn = open_in_memory().expect("db");
        conn.execute("INSERT INTO job_positions(title) VALUES ('Editor')", [])
            .expect("position");
        for stage in ["applied", "applied", "hired"] {
            conn.execute(
                "INSERT INTO applicants(position_id, name, stage) VALUES (1, 'x', ?)",
                [stage],
            )
            .expect("applicant");
        }
        let rows = query_json(&conn, &position_counts_sql(), []).expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["applicant_count"], 3);
        assert_eq!(rows[0]["applied_count"], 2);
        assert_eq!(rows[0]["hired_count"], 1);
        assert_eq!(rows[0]["rejected_count"], 0);
    }
}
