//! Production board: series with their phase milestones and episode slots.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query as QueryParams, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

use super::episodes::EPISODE_STAGES;
use super::series::{completed_values, ensure_series, insert_milestones, SERIES_STATUSES};
use crate::api::error::{ApiError, ApiResult};
use crate::api::helpers::{
    check_not_null, check_opt_one_of, delete_row, fetch_by_id, ok_true, opt_bool, opt_f64, opt_i64,
    opt_str, parse_body, required_i64, required_str, Body, Patch, Query,
};
use crate::api::state::AppState;
use crate::db::query_json;
use crate::schedule::phase_milestones;

const QUICK_DEFAULT_EPISODES: i64 = 5;
const QUICK_MAX_EPISODES: i64 = 12;

const BOARD_EDITABLE: [&str; 11] = [
    "title",
    "location",
    "country",
    "status",
    "target_shoot_start",
    "target_shoot_end",
    "target_publish_date",
    "editor",
    "notes",
    "budget_target",
    "budget_actual",
];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/production/series", get(board).post(create))
        .route("/api/production/series/quick", post(quick_create))
        .route(
            "/api/production/series/:id",
            get(read).put(update).delete(remove),
        )
        .route("/api/production/series/:id/episodes", post(add_episode))
        .route(
            "/api/production/series/:id/episodes/:eid",
            patch(patch_episode),
        )
        .route(
            "/api/production/series/:id/milestones/:mid",
            patch(patch_milestone),
        )
        .route("/api/production/milestones", post(add_milestone))
        .route("/api/production/milestones/toggle", post(toggle_milestone))
        .route("/api/production/calendar", get(calendar))
}

/// Empty strings clear a date rather than storing `''`.
fn date_or_null(body: &Body, key: &str) -> Option<String> {
    opt_str(body, key).filter(|s| !s.is_empty())
}

async fn board(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let mut series = query_json(&conn, "SELECT * FROM series ORDER BY created_at DESC, id DESC", [])?;
    for s in series.iter_mut() {
        let id = s["id"].as_i64().unwrap_or_default();
        let milestones = query_json(
            &conn,
            "SELECT id, title, due_date, completed FROM milestones
             WHERE series_id = ? ORDER BY week_number, id",
            [id],
        )?;
        s["milestones"] = Value::Array(milestones);
    }
    Ok(Json(Value::Array(series)))
}

async fn create(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    let title = required_str(&body, "title")?;
    check_opt_one_of(&body, "status", &SERIES_STATUSES)?;
    let milestones = phase_milestones([
        date_or_null(&body, "phase_pre_prod"),
        date_or_null(&body, "phase_shooting"),
        date_or_null(&body, "phase_editing"),
        date_or_null(&body, "phase_publish"),
    ]);

    let conn = state.db()?;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO series(title, location, status, target_shoot_start, target_shoot_end, notes, budget_target)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            title,
            opt_str(&body, "location").unwrap_or_default(),
            opt_str(&body, "status").unwrap_or_else(|| "ideation".into()),
            date_or_null(&body, "target_shoot_start"),
            date_or_null(&body, "target_shoot_end"),
            opt_str(&body, "notes").unwrap_or_default(),
            opt_f64(&body, "budget_target").unwrap_or(0.0),
        ],
    )?;
    let id = tx.last_insert_rowid();
    insert_milestones(&tx, id, &milestones)?;
    tx.commit()?;
    info!(series_id = id, "production series created");
    Ok(Json(json!({ "id": id })))
}

async fn quick_create(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    let (Ok(title), Ok(country)) = (required_str(&body, "title"), required_str(&body, "country"))
    else {
        return Err(ApiError::bad_request("Title and country are required"));
    };
    let episodes = opt_i64(&body, "episode_count")
        .filter(|n| *n != 0)
        .unwrap_or(QUICK_DEFAULT_EPISODES)
        .clamp(1, QUICK_MAX_EPISODES);

    let conn = state.db()?;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO series(title, location, country, status, notes) VALUES (?, ?, ?, 'ideation', ?)",
        rusqlite::params![
            title,
            country,
            country,
            format!("Auto-created with {} placeholder episodes.", episodes),
        ],
    )?;
    let id = tx.last_insert_rowid();
    insert_milestones(&tx, id, &phase_milestones([None, None, None, None]))?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO episodes(series_id, title, stage, sort_order, episode_type)
             VALUES (?, ?, 'idea', ?, 'cornerstone')",
        )?;
        for i in 1..=episodes {
            stmt.execute(rusqlite::params![id, format!("Episode {}", i), i])?;
        }
    }
    tx.commit()?;
    info!(series_id = id, episodes, "quick series created");
    Ok(Json(json!({ "id": id })))
}

async fn read(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let mut series = fetch_by_id(&conn, "SELECT * FROM series WHERE id = ?", id, "Series")?;
    series["milestones"] = Value::Array(query_json(
        &conn,
        "SELECT * FROM milestones WHERE series_id = ? ORDER BY week_number, id",
        [id],
    )?);
    series["episodes"] = Value::Array(query_json(
        &conn,
        "SELECT * FROM episodes WHERE series_id = ? ORDER BY sort_order, id",
        [id],
    )?);
    Ok(Json(series))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["title"])?;
    check_opt_one_of(&body, "status", &SERIES_STATUSES)?;
    let mut patch = Patch::from_body(&body, &BOARD_EDITABLE);
    patch.require_fields()?;
    for key in ["target_shoot_start", "target_shoot_end", "target_publish_date", "editor"] {
        if body.contains_key(key) {
            patch.set(key, date_or_null(&body, key));
        }
    }
    patch.touch("updated_at");

    let conn = state.db()?;
    if patch.apply(&conn, "series", id)? == 0 {
        return Err(ApiError::not_found("Series"));
    }
    info!(series_id = id, "production series updated");
    Ok(Json(json!({ "id": id })))
}

async fn remove(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    delete_row(&conn, "series", id, "Series")?;
    info!(series_id = id, "production series deleted");
    Ok(ok_true())
}

async fn add_episode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    let title = required_str(&body, "title")?;

    let conn = state.db()?;
    ensure_series(&conn, id)?;
    let max_sort: Option<i64> = conn.query_row(
        "SELECT MAX(sort_order) FROM episodes WHERE series_id = ?",
        [id],
        |r| r.get(0),
    )?;
    conn.execute(
        "INSERT INTO episodes(series_id, title, stage, sort_order, episode_type)
         VALUES (?, ?, 'idea', ?, 'cornerstone')",
        rusqlite::params![id, title, max_sort.unwrap_or(0) + 1],
    )?;
    let episode_id = conn.last_insert_rowid();
    info!(series_id = id, episode_id, "board episode created");
    Ok(Json(json!({ "id": episode_id })))
}

async fn patch_episode(
    State(state): State<Arc<AppState>>,
    Path((id, eid)): Path<(i64, i64)>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["title"])?;
    check_opt_one_of(&body, "stage", &EPISODE_STAGES)?;
    let mut patch = Patch::from_body(&body, &["title", "stage"]);
    for key in ["shoot_date", "publish_date"] {
        if body.contains_key(key) {
            patch.set(key, date_or_null(&body, key));
        }
    }
    if patch.is_empty() {
        return Ok(ok_true());
    }
    patch.touch("updated_at");

    let conn = state.db()?;
    if patch.apply(&conn, "episodes", eid)? == 0 {
        return Err(ApiError::not_found("Episode"));
    }
    info!(series_id = id, episode_id = eid, "board episode updated");
    Ok(ok_true())
}

async fn patch_milestone(
    State(state): State<Arc<AppState>>,
    Path((id, mid)): Path<(i64, i64)>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    let mut patch = Patch::new();
    if body.contains_key("due_date") {
        patch.set("due_date", date_or_null(&body, "due_date"));
    }
    if let Some(done) = opt_bool(&body, "completed") {
        let (flag, stamp) = completed_values(done);
        patch.set("completed", flag);
        patch.set("completed_at", stamp);
    }
    if let Some(title) = opt_str(&body, "title") {
        patch.set("title", title);
    }
    if patch.is_empty() {
        return Ok(ok_true());
    }

    let conn = state.db()?;
    if patch.apply(&conn, "milestones", mid)? == 0 {
        return Err(ApiError::not_found("Milestone"));
    }
    info!(series_id = id, milestone_id = mid, "board milestone updated");
    Ok(ok_true())
}

async fn add_milestone(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    let series_id = required_i64(&body, "series_id")?;
    let title = required_str(&body, "title")?;

    let conn = state.db()?;
    ensure_series(&conn, series_id)?;
    conn.execute(
        "INSERT INTO milestones(series_id, title, due_date, week_number) VALUES (?, ?, ?, 0)",
        rusqlite::params![series_id, title, date_or_null(&body, "due_date")],
    )?;
    let id = conn.last_insert_rowid();
    info!(series_id, milestone_id = id, "board milestone created");
    Ok(Json(json!({ "id": id })))
}

async fn toggle_milestone(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    let id = required_i64(&body, "id")?;
    let (flag, stamp) = completed_values(opt_bool(&body, "completed").unwrap_or(false));

    let conn = state.db()?;
    let changed = conn.execute(
        "UPDATE milestones SET completed = ?, completed_at = ? WHERE id = ?",
        rusqlite::params![flag, stamp, id],
    )?;
    if changed == 0 {
        return Err(ApiError::not_found("Milestone"));
    }
    info!(milestone_id = id, completed = flag, "milestone toggled");
    Ok(ok_true())
}

/// Shoot windows and dated milestones, optionally limited to one `YYYY-MM`.
async fn calendar(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let month = query.get("month").filter(|m| !m.is_empty());
    let in_month = |start: &str| month.map_or(true, |m| start.starts_with(m.as_str()));

    let conn = state.db()?;
    let mut events = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT id, title, status, target_shoot_start, target_shoot_end FROM series
         WHERE target_shoot_start IS NOT NULL AND target_shoot_start != ''
         ORDER BY target_shoot_start, id",
    )?;
    let shoots = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, Option<String>>(4)?,
        ))
    })?;
    for row in shoots {
        let (id, title, status, start, end) = row?;
        if !in_month(&start) {
            continue;
        }
        let end = end.filter(|e| !e.is_empty()).unwrap_or_else(|| start.clone());
        events.push(json!({
            "type": "shoot",
            "title": title,
            "start": start,
            "end": end,
            "status": status,
            "series_id": id,
        }));
    }

    let mut stmt = conn.prepare(
        "SELECT m.series_id, m.title, m.due_date, m.completed, s.title
         FROM milestones m
         JOIN series s ON s.id = m.series_id
         WHERE m.due_date IS NOT NULL AND m.due_date != ''
         ORDER BY m.due_date, m.id",
    )?;
    let milestones = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, Option<i64>>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;
    for row in milestones {
        let (series_id, title, due, completed, series_title) = row?;
        if !in_month(&due) {
            continue;
        }
        let status = if completed.unwrap_or(0) != 0 { "done" } else { "pending" };
        events.push(json!({
            "type": "milestone",
            "title": format!("{}: {}", series_title, title),
            "start": due,
            "end": due,
            "status": status,
            "series_id": series_id,
        }));
    }

    Ok(Json(Value::Array(events)))
}
