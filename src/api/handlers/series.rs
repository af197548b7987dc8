use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use rusqlite::Connection;
use serde_json::Value;
use tracing::info;

use super::episodes::{insert_episode, EPISODE_STAGES};
use crate::api::error::{ApiError, ApiResult};
use crate::api::helpers::{
    check_not_null, check_opt_one_of, created, delete_row, fetch_by_id, now_ts, ok_true, opt_bool,
    opt_f64, opt_str, parse_body, parse_date, required_i64, required_str, update_row, Filters,
    Patch, Query,
};
use crate::api::state::AppState;
use crate::db::query_json;
use crate::schedule::{pre_shoot_milestones, PlannedMilestone};

pub const SERIES_STATUSES: [&str; 6] = [
    "ideation",
    "pre_prod",
    "shooting",
    "post_prod",
    "published",
    "archived",
];
const TRAVEL_TYPES: [&str; 5] = ["flight", "hotel", "transport", "permit", "other"];

const SERIES_EDITABLE: [&str; 16] = [
    "title",
    "location",
    "country",
    "status",
    "target_shoot_start",
    "target_shoot_end",
    "actual_shoot_start",
    "actual_shoot_end",
    "target_publish_date",
    "fixer_id",
    "producer_id",
    "camera_id",
    "editor",
    "budget_target",
    "budget_actual",
    "notes",
];
const TRAVEL_EDITABLE: [&str; 10] = [
    "type",
    "title",
    "details",
    "date_start",
    "date_end",
    "cost",
    "currency",
    "booked",
    "confirmation_number",
    "notes",
];

const SERIES_WITH_PEOPLE: &str = "
    SELECT s.*,
        p1.name AS fixer_name, p2.name AS producer_name, p3.name AS camera_name
    FROM series s
    LEFT JOIN people p1 ON s.fixer_id = p1.id
    LEFT JOIN people p2 ON s.producer_id = p2.id
    LEFT JOIN people p3 ON s.camera_id = p3.id";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/series", get(list).post(create))
        .route("/api/series/:id", get(read).put(update).delete(remove))
        .route(
            "/api/series/:id/milestones",
            get(list_milestones).put(set_milestone_done),
        )
        .route("/api/series/:id/episodes", get(list_episodes).post(add_episode))
        .route("/api/series/:id/travel", get(list_travel).post(add_travel))
        .route("/api/milestones/:id", put(update_milestone))
        .route("/api/travel/:id", put(update_travel).delete(remove_travel))
}

pub fn insert_milestones(
    conn: &Connection,
    series_id: i64,
    milestones: &[PlannedMilestone],
) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO milestones(series_id, week_number, title, due_date) VALUES (?, ?, ?, ?)",
    )?;
    for m in milestones {
        stmt.execute(rusqlite::params![series_id, m.week_number, m.title, m.due_date])?;
    }
    Ok(())
}

pub fn ensure_series(conn: &Connection, id: i64) -> ApiResult<()> {
    fetch_by_id(conn, "SELECT id FROM series WHERE id = ?", id, "Series").map(|_| ())
}

async fn list(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let mut filters = Filters::new();
    filters.from_query(&query, "status", "s.status = ?");
    let sql = format!(
        "SELECT s.*,
            p1.name AS fixer_name, p2.name AS producer_name, p3.name AS camera_name,
            COUNT(DISTINCT e.id) AS episode_count
         FROM series s
         LEFT JOIN people p1 ON s.fixer_id = p1.id
         LEFT JOIN people p2 ON s.producer_id = p2.id
         LEFT JOIN people p3 ON s.camera_id = p3.id
         LEFT JOIN episodes e ON s.id = e.series_id
         {}
         GROUP BY s.id
         ORDER BY s.created_at DESC, s.id DESC",
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
    let title = required_str(&body, "title")?;
    check_opt_one_of(&body, "status", &SERIES_STATUSES)?;
    let shoot_start = opt_str(&body, "target_shoot_start").filter(|s| !s.is_empty());
    let milestones = match &shoot_start {
        Some(raw) => pre_shoot_milestones(parse_date("target_shoot_start", raw)?),
        None => Vec::new(),
    };

    let conn = state.db()?;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO series(title, location, status, target_shoot_start, target_shoot_end, budget_target, notes)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            title,
            opt_str(&body, "location").unwrap_or_default(),
            opt_str(&body, "status").unwrap_or_else(|| "ideation".into()),
            shoot_start,
            opt_str(&body, "target_shoot_end").filter(|s| !s.is_empty()),
            opt_f64(&body, "budget_target").unwrap_or(0.0),
            opt_str(&body, "notes").unwrap_or_default(),
        ],
    )?;
    let id = tx.last_insert_rowid();
    insert_milestones(&tx, id, &milestones)?;
    tx.commit()?;
    info!(series_id = id, milestones = milestones.len(), "series created");

    Ok(created(fetch_by_id(&conn, "SELECT * FROM series WHERE id = ?", id, "Series")?))
}

async fn read(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let sql = format!("{} WHERE s.id = ?", SERIES_WITH_PEOPLE);
    Ok(Json(fetch_by_id(&conn, &sql, id, "Series")?))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["title"])?;
    check_opt_one_of(&body, "status", &SERIES_STATUSES)?;
    let mut patch = Patch::from_body(&body, &SERIES_EDITABLE);
    patch.require_fields()?;
    patch.touch("updated_at");

    let conn = state.db()?;
    let row = update_row(&conn, "series", id, patch, "Series")?;
    info!(series_id = id, "series updated");
    Ok(Json(row))
}

async fn remove(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    delete_row(&conn, "series", id, "Series")?;
    info!(series_id = id, "series deleted");
    Ok(ok_true())
}

async fn list_milestones(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let rows = query_json(
        &conn,
        "SELECT * FROM milestones WHERE series_id = ? ORDER BY week_number, due_date",
        [id],
    )?;
    Ok(Json(Value::Array(rows)))
}

pub fn completed_values(completed: bool) -> (i64, Option<String>) {
    if completed {
        (1, Some(now_ts()))
    } else {
        (0, None)
    }
}

async fn set_milestone_done(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    let milestone_id = required_i64(&body, "milestoneId")?;
    let (flag, stamp) = completed_values(opt_bool(&body, "completed").unwrap_or(false));

    let conn = state.db()?;
    let changed = conn.execute(
        "UPDATE milestones SET completed = ?, completed_at = ? WHERE id = ? AND series_id = ?",
        rusqlite::params![flag, stamp, milestone_id, id],
    )?;
    if changed == 0 {
        return Err(ApiError::not_found("Milestone"));
    }
    info!(series_id = id, milestone_id, completed = flag, "milestone toggled");
    Ok(ok_true())
}

async fn update_milestone(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    let (flag, stamp) = completed_values(opt_bool(&body, "completed").unwrap_or(false));
    let mut patch = Patch::new();
    patch.set("completed", flag);
    patch.set("completed_at", stamp);

    let conn = state.db()?;
    let row = update_row(&conn, "milestones", id, patch, "Milestone")?;
    info!(milestone_id = id, completed = flag, "milestone updated");
    Ok(Json(row))
}

async fn list_episodes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let rows = query_json(
        &conn,
        "SELECT e.*, p.name AS editor_name
         FROM episodes e
         LEFT JOIN people p ON e.editor_id = p.id
         WHERE e.series_id = ?
         ORDER BY e.sort_order, e.created_at, e.id",
        [id],
    )?;
    Ok(Json(Value::Array(rows)))
}

async fn add_episode(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    required_str(&body, "title")?;
    check_opt_one_of(&body, "stage", &EPISODE_STAGES)?;

    let conn = state.db()?;
    ensure_series(&conn, id)?;
    let episode_id = insert_episode(&conn, id, &body)?;
    info!(series_id = id, episode_id, "episode created");
    Ok(created(fetch_by_id(
        &conn,
        "SELECT * FROM episodes WHERE id = ?",
        episode_id,
        "Episode",
    )?))
}

async fn list_travel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let rows = query_json(
        &conn,
        "SELECT * FROM travel WHERE series_id = ? ORDER BY date_start",
        [id],
    )?;
    Ok(Json(Value::Array(rows)))
}

async fn add_travel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let body = parse_body(&body)?;
    let title = required_str(&body, "title")?;
    check_opt_one_of(&body, "type", &TRAVEL_TYPES)?;

    let conn = state.db()?;
    ensure_series(&conn, id)?;
    conn.execute(
        "INSERT INTO travel(series_id, type, title, details, date_start, date_end, cost, currency,
            booked, confirmation_number, notes)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            id,
            opt_str(&body, "type").unwrap_or_else(|| "other".into()),
            title,
            opt_str(&body, "details").unwrap_or_default(),
            opt_str(&body, "date_start").filter(|s| !s.is_empty()),
            opt_str(&body, "date_end").filter(|s| !s.is_empty()),
            opt_f64(&body, "cost").unwrap_or(0.0),
            opt_str(&body, "currency").unwrap_or_else(|| "USD".into()),
            opt_bool(&body, "booked").map_or(0, i64::from),
            opt_str(&body, "confirmation_number").unwrap_or_default(),
            opt_str(&body, "notes").unwrap_or_default(),
        ],
    )?;
    let travel_id = conn.last_insert_rowid();
    info!(series_id = id, travel_id, "travel item created");
    Ok(created(fetch_by_id(
        &conn,
        "SELECT * FROM travel WHERE id = ?",
        travel_id,
        "Travel item",
    )?))
}

async fn update_travel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["title"])?;
    check_opt_one_of(&body, "type", &TRAVEL_TYPES)?;
    let mut patch = Patch::from_body(&body, &TRAVEL_EDITABLE);
    patch.require_fields()?;
    if let Some(booked) = opt_bool(&body, "booked") {
        patch.set("booked", i64::from(booked));
    }

    let conn = state.db()?;
    let row = update_row(&conn, "travel", id, patch, "Travel item")?;
    info!(travel_id = id, "travel item updated");
    Ok(Json(row))
}

async fn remove_travel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    delete_row(&conn, "travel", id, "Travel item")?;
    info!(travel_id = id, "travel item deleted");
    Ok(ok_true())
}
