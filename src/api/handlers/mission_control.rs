//! Agent coordination board: agents, their tasks, task threads, an activity
//! feed and attached documents.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::api::helpers::{
    check_not_null, created, fetch_by_id, opt_i64, opt_str, parse_body, required_i64, required_str,
    Body, Filters, Patch, Query,
};
use crate::api::state::AppState;
use crate::db::{count, query_json};

const DEFAULT_ACTIVITY_LIMIT: i64 = 40;
const MAX_ACTIVITY_LIMIT: i64 = 200;

const AGENT_EDITABLE: [&str; 10] = [
    "status",
    "current_task_id",
    "session_key",
    "last_heartbeat",
    "avatar_color",
    "avatar_icon",
    "codename",
    "role",
    "role_type",
    "name",
];
const TASK_EDITABLE: [&str; 5] = ["title", "description", "status", "priority", "created_by"];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/mission-control/agents",
            get(list_agents).post(create_agent),
        )
        .route("/api/mission-control/agents/:id", patch(update_agent))
        .route(
            "/api/mission-control/tasks",
            get(list_tasks).post(create_task),
        )
        .route("/api/mission-control/tasks/:id", patch(update_task))
        .route(
            "/api/mission-control/messages",
            get(list_messages).post(create_message),
        )
        .route(
            "/api/mission-control/activities",
            get(list_activities).post(create_activity),
        )
        .route(
            "/api/mission-control/documents",
            get(list_documents).post(create_document),
        )
        .route("/api/mission-control/stats", get(stats))
}

fn record_activity(
    conn: &Connection,
    kind: &str,
    agent_id: Option<&str>,
    message: &str,
    task_id: Option<i64>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO mc_activities(type, agent_id, message, task_id) VALUES (?, ?, ?, ?)",
        rusqlite::params![kind, agent_id, message, task_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Stored as JSON text. Anything that is not an array reads back as `[]`.
fn json_array(raw: Option<&Value>) -> Value {
    raw.and_then(Value::as_str)
        .and_then(|s| serde_json::from_str::<Value>(s).ok())
        .filter(Value::is_array)
        .unwrap_or_else(|| json!([]))
}

fn shape_task(mut row: Value) -> Value {
    let assignees = json_array(row.get("assignee_ids"));
    let tags = json_array(row.get("tags"));
    if let Some(obj) = row.as_object_mut() {
        obj.insert("assignee_ids".into(), assignees);
        obj.insert("tags".into(), tags);
    }
    row
}

fn array_text(body: &Body, key: &str) -> String {
    match body.get(key) {
        Some(v @ Value::Array(_)) => v.to_string(),
        _ => "[]".to_string(),
    }
}

fn read_task(conn: &Connection, id: i64) -> ApiResult<Value> {
    Ok(shape_task(fetch_by_id(
        conn,
        "SELECT * FROM mc_tasks WHERE id = ?",
        id,
        "Task",
    )?))
}

async fn list_agents(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let rows = query_json(
        &conn,
        "SELECT a.*, t.title AS current_task_title, t.status AS current_task_status
         FROM mc_agents a
         LEFT JOIN mc_tasks t ON a.current_task_id = t.id
         ORDER BY a.created_at, a.name",
        [],
    )?;
    Ok(Json(Value::Array(rows)))
}

async fn create_agent(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    let name = required_str(&body, "name")?;
    let id = Uuid::new_v4().to_string();

    let conn = state.db()?;
    conn.execute(
        "INSERT INTO mc_agents(id, name, codename, role, role_type, status, avatar_color, avatar_icon)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            name,
            opt_str(&body, "codename"),
            opt_str(&body, "role"),
            opt_str(&body, "role_type"),
            opt_str(&body, "status").unwrap_or_else(|| "idle".into()),
            opt_str(&body, "avatar_color"),
            opt_str(&body, "avatar_icon"),
        ],
    )?;
    info!(agent_id = %id, "agent created");
    Ok(created(fetch_by_id(
        &conn,
        "SELECT * FROM mc_agents WHERE id = ?",
        id,
        "Agent",
    )?))
}

async fn update_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    let patch = Patch::from_body(&body, &AGENT_EDITABLE);
    patch.require_fields()?;

    let conn = state.db()?;
    if patch.apply(&conn, "mc_agents", id.clone())? == 0 {
        return Err(ApiError::not_found("Agent"));
    }
    info!(agent_id = %id, "agent updated");
    Ok(Json(fetch_by_id(
        &conn,
        "SELECT * FROM mc_agents WHERE id = ?",
        id,
        "Agent",
    )?))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let mut filters = Filters::new();
    filters.from_query(&query, "status", "status = ?");
    if let Some(assignee) = query.get("assignee").filter(|a| !a.is_empty()) {
        filters.push("assignee_ids LIKE ?", format!("%\"{}\"%", assignee));
    }
    if let Some(id) = query.get("id").and_then(|v| v.parse::<i64>().ok()) {
        filters.push("id = ?", id);
    }
    let sql = format!(
        "SELECT * FROM mc_tasks{} ORDER BY updated_at DESC, id DESC",
        filters.where_sql()
    );
    let conn = state.db()?;
    let rows = query_json(&conn, &sql, filters.params())?;
    Ok(Json(Value::Array(rows.into_iter().map(shape_task).collect())))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    let title = required_str(&body, "title")?;
    let created_by = opt_str(&body, "created_by");

    let conn = state.db()?;
    conn.execute(
        "INSERT INTO mc_tasks(title, description, status, priority, assignee_ids, tags, created_by)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            title,
            opt_str(&body, "description"),
            opt_str(&body, "status").unwrap_or_else(|| "inbox".into()),
            opt_str(&body, "priority").unwrap_or_else(|| "normal".into()),
            array_text(&body, "assignee_ids"),
            array_text(&body, "tags"),
            created_by,
        ],
    )?;
    let id = conn.last_insert_rowid();
    record_activity(&conn, "task", created_by.as_deref(), "created", Some(id))?;
    info!(mc_task_id = id, "mission task created");
    Ok(created(read_task(&conn, id)?))
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["title"])?;
    let mut patch = Patch::from_body(&body, &TASK_EDITABLE);
    for key in ["assignee_ids", "tags"] {
        if body.contains_key(key) {
            patch.set(key, array_text(&body, key));
        }
    }
    patch.require_fields()?;
    patch.touch("updated_at");

    let conn = state.db()?;
    let existing: Option<(Option<String>, Option<String>)> = conn
        .query_row(
            "SELECT status, created_by FROM mc_tasks WHERE id = ?",
            [id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((prev_status, task_creator)) = existing else {
        return Err(ApiError::not_found("Task"));
    };
    patch.apply(&conn, "mc_tasks", id)?;

    let next_status = opt_str(&body, "status").or_else(|| prev_status.clone());
    if next_status != prev_status {
        let actor = opt_str(&body, "updated_by")
            .or_else(|| opt_str(&body, "created_by"))
            .or(task_creator);
        let message = format!("moved to {}", next_status.unwrap_or_default());
        record_activity(&conn, "status", actor.as_deref(), &message, Some(id))?;
    }
    info!(mc_task_id = id, "mission task updated");
    Ok(Json(read_task(&conn, id)?))
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let task_id = query
        .get("task_id")
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| ApiError::bad_request("task_id is required"))?;
    let conn = state.db()?;
    let rows = query_json(
        &conn,
        "SELECT m.*, a.name AS agent_name, a.avatar_color AS agent_color
         FROM mc_messages m
         LEFT JOIN mc_agents a ON m.from_agent_id = a.id
         WHERE m.task_id = ?
         ORDER BY m.created_at, m.id",
        [task_id],
    )?;
    Ok(Json(Value::Array(rows)))
}

async fn create_message(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    let task_id = required_i64(&body, "task_id")?;
    let content = required_str(&body, "content")?;
    let from = opt_str(&body, "from_agent_id");

    let conn = state.db()?;
    conn.execute(
        "INSERT INTO mc_messages(task_id, from_agent_id, content) VALUES (?, ?, ?)",
        rusqlite::params![task_id, from, content],
    )?;
    let id = conn.last_insert_rowid();
    record_activity(&conn, "comment", from.as_deref(), "commented on task", Some(task_id))?;
    info!(message_id = id, mc_task_id = task_id, "mission message posted");
    Ok(created(fetch_by_id(
        &conn,
        "SELECT * FROM mc_messages WHERE id = ?",
        id,
        "Message",
    )?))
}

fn activity_limit(query: &Query) -> i64 {
    query
        .get("limit")
        .and_then(|v| v.parse::<i64>().ok())
        .map_or(DEFAULT_ACTIVITY_LIMIT, |n| n.clamp(1, MAX_ACTIVITY_LIMIT))
}

async fn list_activities(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let mut filters = Filters::new();
    filters.from_query(&query, "agent", "a.agent_id = ?");
    let sql = format!(
        "SELECT a.*, ag.name AS agent_name, ag.avatar_color AS agent_color, t.title AS task_title
         FROM mc_activities a
         LEFT JOIN mc_agents ag ON a.agent_id = ag.id
         LEFT JOIN mc_tasks t ON a.task_id = t.id
         {}
         ORDER BY a.created_at DESC, a.id DESC
         LIMIT {}",
        filters.where_sql(),
        activity_limit(&query)
    );
    let conn = state.db()?;
    Ok(Json(Value::Array(query_json(&conn, &sql, filters.params())?)))
}

async fn create_activity(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    let kind = required_str(&body, "type")?;
    let message = required_str(&body, "message")?;

    let conn = state.db()?;
    let id = record_activity(
        &conn,
        &kind,
        opt_str(&body, "agent_id").as_deref(),
        &message,
        opt_i64(&body, "task_id"),
    )?;
    Ok(created(fetch_by_id(
        &conn,
        "SELECT * FROM mc_activities WHERE id = ?",
        id,
        "Activity",
    )?))
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let mut filters = Filters::new();
    if let Some(task_id) = query.get("task_id").and_then(|v| v.parse::<i64>().ok()) {
        filters.push("d.task_id = ?", task_id);
    }
    filters.from_query(&query, "agent_id", "d.agent_id = ?");
    let sql = format!(
        "SELECT d.*, a.name AS agent_name, a.avatar_color AS agent_color
         FROM mc_documents d
         LEFT JOIN mc_agents a ON d.agent_id = a.id
         {}
         ORDER BY d.created_at DESC, d.id DESC",
        filters.where_sql()
    );
    let conn = state.db()?;
    Ok(Json(Value::Array(query_json(&conn, &sql, filters.params())?)))
}

async fn create_document(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    let title = required_str(&body, "title")?;

    let conn = state.db()?;
    conn.execute(
        "INSERT INTO mc_documents(title, content, type, task_id, agent_id) VALUES (?, ?, ?, ?, ?)",
        rusqlite::params![
            title,
            opt_str(&body, "content").unwrap_or_default(),
            opt_str(&body, "type").unwrap_or_else(|| "note".into()),
            opt_i64(&body, "task_id"),
            opt_str(&body, "agent_id"),
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(document_id = id, "mission document created");
    Ok(created(fetch_by_id(
        &conn,
        "SELECT * FROM mc_documents WHERE id = ?",
        id,
        "Document",
    )?))
}

async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    Ok(Json(json!({
        "agentsActive": count(&conn, "SELECT COUNT(*) FROM mc_agents WHERE status = 'working'")?,
        "tasksInQueue": count(&conn, "SELECT COUNT(*) FROM mc_tasks WHERE status != 'done'")?,
        "totalTasks": count(&conn, "SELECT COUNT(*) FROM mc_tasks")?,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn task_arrays_are_decoded() {
        let row = shape_task(json!({
            "id": 1,
            "assignee_ids": "[\"a1\",\"a2\"]",
            "tags": "not json",
        }));
        assert_eq!(row["assignee_ids"], json!(["a1", "a2"]));
        assert_eq!(row["tags"], json!([]));
    }

    #[test]
    fn activity_limit_is_bounded() {
        let q = |v: &str| HashMap::from([("limit".to_string(), v.to_string())]);
        assert_eq!(activity_limit(&HashMap::new()), 40);
        assert_eq!(activity_limit(&q("10")), 10);
        assert_eq!(activity_limit(&q("5000")), 200);
        assert_eq!(activity_limit(&q("abc")), 40);
    }
}
