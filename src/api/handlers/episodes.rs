use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use rusqlite::Connection;
use serde_json::Value;
use tracing::info;

use super::series::ensure_series;
use crate::api::error::ApiResult;
use crate::api::helpers::{
    check_not_null, check_opt_one_of, created, delete_row, fetch_by_id, ok_true, opt_i64, opt_str,
    parse_body, required_i64, required_str, update_row, Body, Filters, Patch, Query,
};
use crate::api::state::AppState;
use crate::db::query_json;

pub const EPISODE_STAGES: [&str; 7] = [
    "idea",
    "outlined",
    "confirmed",
    "filming",
    "editing",
    "review",
    "published",
];
const PHASES: [&str; 4] = ["preprod", "shoot", "post", "publish"];
const PHASE_STATUSES: [&str; 3] = ["planned", "in_progress", "done"];

const EPISODE_EDITABLE: [&str; 17] = [
    "title",
    "stage",
    "episode_type",
    "shoot_date",
    "rough_cut_due",
    "publish_date",
    "actual_publish_date",
    "editor_id",
    "youtube_video_id",
    "youtube_url",
    "view_count",
    "thumbnail_concept",
    "thumbnail_url",
    "hook",
    "outline",
    "notes",
    "sort_order",
];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/episodes", get(list).post(create))
        .route("/api/episodes/:id", get(read).put(update).delete(remove))
        .route("/api/episodes/:id/phases", get(list_phases).post(add_phase))
        .route("/api/phases/:id", patch(update_phase).delete(remove_phase))
}

/// Shared by the episode endpoints that create under a known series.
pub fn insert_episode(conn: &Connection, series_id: i64, body: &Body) -> ApiResult<i64> {
    conn.execute(
        "INSERT INTO episodes(series_id, title, stage, episode_type, shoot_date, publish_date,
            hook, outline, notes, sort_order)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            series_id,
            required_str(body, "title")?,
            opt_str(body, "stage").unwrap_or_else(|| "idea".into()),
            opt_str(body, "episode_type").unwrap_or_else(|| "cornerstone".into()),
            opt_str(body, "shoot_date").filter(|s| !s.is_empty()),
            opt_str(body, "publish_date").filter(|s| !s.is_empty()),
            opt_str(body, "hook").unwrap_or_default(),
            opt_str(body, "outline").unwrap_or_default(),
            opt_str(body, "notes").unwrap_or_default(),
            opt_i64(body, "sort_order").unwrap_or(0),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

async fn list(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let mut filters = Filters::new();
    filters.from_query(&query, "series_id", "e.series_id = ?");
    let sql = format!(
        "SELECT e.*, s.title AS series_title, p.name AS editor_name,
            (SELECT sp.brand_name FROM sponsors sp WHERE sp.episode_id = e.id
             ORDER BY sp.id LIMIT 1) AS sponsor_name
         FROM episodes e
         LEFT JOIN series s ON e.series_id = s.id
         LEFT JOIN people p ON e.editor_id = p.id
         {}
         ORDER BY e.sort_order, e.created_at, e.id",
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
    let series_id = required_i64(&body, "series_id")?;
    required_str(&body, "title")?;
    check_opt_one_of(&body, "stage", &EPISODE_STAGES)?;

    let conn = state.db()?;
    ensure_series(&conn, series_id)?;
    let id = insert_episode(&conn, series_id, &body)?;
    info!(episode_id = id, series_id, "episode created");
    Ok(created(fetch_by_id(&conn, "SELECT * FROM episodes WHERE id = ?", id, "Episode")?))
}

async fn read(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let row = fetch_by_id(
        &conn,
        "SELECT e.*, s.title AS series_title, p.name AS editor_name
         FROM episodes e
         LEFT JOIN series s ON e.series_id = s.id
         LEFT JOIN people p ON e.editor_id = p.id
         WHERE e.id = ?",
        id,
        "Episode",
    )?;
    Ok(Json(row))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["title"])?;
    check_opt_one_of(&body, "stage", &EPISODE_STAGES)?;
    let mut patch = Patch::from_body(&body, &EPISODE_EDITABLE);
    patch.require_fields()?;
    patch.touch("updated_at");

    let conn = state.db()?;
    let row = update_row(&conn, "episodes", id, patch, "Episode")?;
    info!(episode_id = id, "episode updated");
    Ok(Json(row))
}

async fn remove(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    delete_row(&conn, "episodes", id, "Episode")?;
    info!(episode_id = id, "episode deleted");
    Ok(ok_true())
}

async fn list_phases(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let rows = query_json(
        &conn,
        "SELECT * FROM episode_phases WHERE episode_id = ? ORDER BY start_date, id",
        [id],
    )?;
    Ok(Json(Value::Array(rows)))
}

async fn add_phase(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    let phase = required_str(&body, "phase")?;
    check_opt_one_of(&body, "phase", &PHASES)?;
    check_opt_one_of(&body, "status", &PHASE_STATUSES)?;
    let start = required_str(&body, "start_date")?;
    let end = opt_str(&body, "end_date")
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| start.clone());

    let conn = state.db()?;
    fetch_by_id(&conn, "SELECT id FROM episodes WHERE id = ?", id, "Episode")?;
    conn.execute(
        "INSERT INTO episode_phases(episode_id, phase, start_date, end_date, status)
         VALUES (?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            phase,
            start,
            end,
            opt_str(&body, "status").unwrap_or_else(|| "planned".into()),
        ],
    )?;
    let phase_id = conn.last_insert_rowid();
    info!(episode_id = id, phase_id, "phase created");
    Ok(created(fetch_by_id(
        &conn,
        "SELECT * FROM episode_phases WHERE id = ?",
        phase_id,
        "Phase",
    )?))
}

async fn update_phase(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["start_date", "end_date"])?;
    check_opt_one_of(&body, "phase", &PHASES)?;
    check_opt_one_of(&body, "status", &PHASE_STATUSES)?;
    let patch = Patch::from_body(&body, &["phase", "start_date", "end_date", "status"]);
    patch.require_fields()?;

    let conn = state.db()?;
    let row = update_row(&conn, "episode_phases", id, patch, "Phase")?;
    info!(phase_id = id, "phase updated");
    Ok(Json(row))
}

async fn remove_phase(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    delete_row(&conn, "episode_phases", id, "Phase")?;
    info!(phase_id = id, "phase deleted");
    Ok(ok_true())
}
