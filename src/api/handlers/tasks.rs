use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::helpers::{
    check_not_null, check_opt_one_of, created, fetch_by_id, log_activity, now_ts, ok_true, opt_str,
    parse_body, required_str, Patch, Query,
};
use crate::api::state::AppState;
use crate::db::{count, query_json};

const STAGES: [&str; 4] = ["backlog", "in_progress", "review", "done"];
const PRIORITIES: [&str; 4] = ["low", "normal", "high", "urgent"];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tasks", get(list).post(create))
        .route("/api/tasks/:id", get(read).put(update).delete(remove))
        .route("/api/stats", get(stats))
        .route("/api/activity", post(log_external))
}

async fn list(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let rows = query_json(&conn, "SELECT * FROM tasks ORDER BY created_at DESC, id DESC", [])?;
    Ok(Json(Value::Array(rows)))
}

async fn create(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    let title = required_str(&body, "title")?;
    check_opt_one_of(&body, "stage", &STAGES)?;
    check_opt_one_of(&body, "priority", &PRIORITIES)?;

    let conn = state.db()?;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO tasks(title, description, stage, project, priority) VALUES (?, ?, ?, ?, ?)",
        rusqlite::params![
            title,
            opt_str(&body, "description").unwrap_or_default(),
            opt_str(&body, "stage").unwrap_or_else(|| "backlog".into()),
            opt_str(&body, "project").unwrap_or_else(|| "general".into()),
            opt_str(&body, "priority").unwrap_or_else(|| "normal".into()),
        ],
    )?;
    let id = tx.last_insert_rowid();
    log_activity(&tx, "created", Some(id), &format!("Created: {}", title))?;
    tx.commit()?;
    info!(task_id = id, "task created");

    let row = fetch_by_id(&conn, "SELECT * FROM tasks WHERE id = ?", id, "Task")?;
    Ok(created(row))
}

async fn read(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    Ok(Json(fetch_by_id(&conn, "SELECT * FROM tasks WHERE id = ?", id, "Task")?))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["title"])?;
    check_opt_one_of(&body, "stage", &STAGES)?;
    check_opt_one_of(&body, "priority", &PRIORITIES)?;

    let conn = state.db()?;
    let old = fetch_by_id(&conn, "SELECT * FROM tasks WHERE id = ?", id, "Task")?;
    let mut patch = Patch::from_body(
        &body,
        &["title", "description", "stage", "project", "priority"],
    );
    if patch.is_empty() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let old_title = old["title"].as_str().unwrap_or_default();
    let old_stage = old["stage"].as_str().unwrap_or_default();
    let tx = conn.unchecked_transaction()?;
    if let Some(stage) = opt_str(&body, "stage").filter(|s| s != old_stage) {
        if stage == "done" {
            patch.set("completed_at", now_ts());
            log_activity(&tx, "completed", Some(id), &format!("Completed: {}", old_title))?;
        } else {
            patch.set("completed_at", rusqlite::types::Value::Null);
            let details = if old_stage == "backlog" && stage == "in_progress" {
                format!("Started: {}", old_title)
            } else {
                format!("Moved: {} → {}", old_title, stage)
            };
            log_activity(&tx, "moved", Some(id), &details)?;
        }
    }
    patch.touch("updated_at");
    patch.apply(&tx, "tasks", id)?;
    tx.commit()?;
    info!(task_id = id, "task updated");

    Ok(Json(fetch_by_id(&conn, "SELECT * FROM tasks WHERE id = ?", id, "Task")?))
}

async fn remove(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    if conn.execute("DELETE FROM tasks WHERE id = ?", [id])? == 0 {
        return Err(ApiError::not_found("Task"));
    }
    info!(task_id = id, "task deleted");
    Ok(ok_true())
}

async fn stats(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    if query.get("type").map(String::as_str) == Some("activity") {
        let rows = query_json(
            &conn,
            "SELECT * FROM activity_log ORDER BY created_at DESC, id DESC LIMIT 20",
            [],
        )?;
        return Ok(Json(Value::Array(rows)));
    }

    let this_week = count(
        &conn,
        "SELECT COUNT(*) FROM tasks WHERE created_at >= datetime('now', '-7 days')",
    )?;
    let in_progress = count(&conn, "SELECT COUNT(*) FROM tasks WHERE stage = 'in_progress'")?;
    let total = count(&conn, "SELECT COUNT(*) FROM tasks")?;
    let done = count(&conn, "SELECT COUNT(*) FROM tasks WHERE stage = 'done'")?;
    let completion = if total > 0 {
        (done as f64 / total as f64 * 100.0).round() as i64
    } else {
        0
    };

    Ok(Json(json!({
        "thisWeek": this_week,
        "inProgress": in_progress,
        "total": total,
        "completion": completion,
    })))
}

/// Activity pushed by outside tools. `source` doubles as the action name.
async fn log_external(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    let (Some(action), Some(details)) = (
        opt_str(&body, "action").filter(|s| !s.is_empty()),
        opt_str(&body, "details").filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::bad_request("action and details required"));
    };
    let source = opt_str(&body, "source").filter(|s| !s.is_empty());

    let conn = state.db()?;
    log_activity(
        &conn,
        source.as_deref().unwrap_or("external"),
        None,
        &format!("[{}] {}", source.as_deref().unwrap_or("system"), details),
    )?;
    let id = conn.last_insert_rowid();
    info!(activity_id = id, "external activity logged");

    Ok(created(json!({
        "id": id,
        "action": action,
        "details": details,
        "created_at": now_ts(),
    })))
}
