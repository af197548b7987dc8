//! Read-only schedule views: the month calendar, the series timeline and the
//! phase gantt chart.

use std::sync::Arc;

use axum::{
    extract::{Query as QueryParams, State},
    routing::get,
    Json, Router,
};
use chrono::{Datelike, Duration, Local, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};

use crate::alerts::parse_day;
use crate::api::error::ApiResult;
use crate::api::helpers::Query;
use crate::api::state::AppState;
use crate::db::query_json;

const FALLBACK_COLOR: &str = "#8b949e";
const SPONSOR_COLOR: &str = "#58a6ff";
const MILESTONE_COLOR: &str = "#f85149";
const IDEA_COLOR: &str = "#8b949e";
const SERIES_COLOR: &str = "#30363d";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/calendar", get(calendar))
        .route("/api/timeline", get(timeline))
        .route("/api/gantt", get(gantt))
}

fn phase_color(phase: &str) -> &'static str {
    match phase {
        "preprod" => "#58a6ff",
        "shoot" => "#a371f7",
        "post" => "#d29922",
        "publish" => "#3fb950",
        _ => FALLBACK_COLOR,
    }
}

fn series_status_color(status: &str) -> &'static str {
    match status {
        "pre_prod" => "#58a6ff",
        "shooting" => "#a371f7",
        "post_prod" => "#d29922",
        "published" => "#3fb950",
        _ => FALLBACK_COLOR,
    }
}

fn episode_stage_color(stage: &str) -> &'static str {
    match stage {
        "outlined" | "confirmed" => "#58a6ff",
        "filming" => "#a371f7",
        "editing" | "published" => "#3fb950",
        "review" => "#d29922",
        _ => FALLBACK_COLOR,
    }
}

fn phase_progress(status: &str) -> i64 {
    match status {
        "in_progress" => 50,
        "done" => 100,
        _ => 0,
    }
}

fn ymd(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Shifts a stored date by `days`. Unparsable input is returned unchanged.
fn shift(raw: &str, days: i64) -> String {
    parse_day(Some(raw)).map_or_else(|| raw.to_string(), |d| ymd(d + Duration::days(days)))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub all_day: bool,
    pub background_color: &'static str,
    pub border_color: &'static str,
}

impl CalendarEvent {
    fn new(id: String, title: String, start: String, end: Option<String>, color: &'static str) -> Self {
        Self {
            id,
            title,
            start,
            end,
            all_day: true,
            background_color: color,
            border_color: color,
        }
    }
}

/// `[start, end)` window; both default to the month containing `today`.
fn calendar_window(query: &Query, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let month_start = today.with_day(1).unwrap_or(today);
    let next_month = if month_start.month() == 12 {
        NaiveDate::from_ymd_opt(month_start.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(month_start.year(), month_start.month() + 1, 1)
    }
    .unwrap_or(month_start);
    let start = parse_day(query.get("start").map(String::as_str)).unwrap_or(month_start);
    let end = parse_day(query.get("end").map(String::as_str)).unwrap_or(next_month);
    (start, end)
}

fn calendar_events(
    conn: &Connection,
    start: NaiveDate,
    end_exclusive: NaiveDate,
) -> rusqlite::Result<Vec<CalendarEvent>> {
    let start = ymd(start);
    let last = ymd(end_exclusive - Duration::days(1));
    let mut events = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT ep.id, ep.phase, ep.start_date, ep.end_date, e.title
         FROM episode_phases ep
         JOIN episodes e ON ep.episode_id = e.id
         WHERE ep.start_date <= ? AND ep.end_date >= ?
         ORDER BY ep.start_date, ep.id",
    )?;
    let rows = stmt.query_map([&last, &start], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
        ))
    })?;
    for row in rows {
        let (id, phase, phase_start, phase_end, episode) = row?;
        events.push(CalendarEvent::new(
            format!("phase-{}", id),
            format!("{}: {}", phase.to_uppercase(), episode),
            phase_start,
            Some(shift(&phase_end, 1)),
            phase_color(&phase),
        ));
    }

    let mut stmt = conn.prepare(
        "SELECT id, brand_name, script_due, live_date, payment_due_date
         FROM sponsors
         WHERE (script_due BETWEEN ?1 AND ?2)
            OR (live_date BETWEEN ?1 AND ?2)
            OR (payment_due_date BETWEEN ?1 AND ?2)
         ORDER BY id",
    )?;
    let rows = stmt.query_map([&start, &last], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, Option<String>>(4)?,
        ))
    })?;
    for row in rows {
        let (id, brand, script_due, live, payment_due) = row?;
        let dated = [
            ("script", "Script due", script_due),
            ("live", "Live", live),
            ("pay", "Payment due", payment_due),
        ];
        for (key, label, date) in dated {
            if let Some(date) = date.filter(|d| *d >= start && *d <= last) {
                events.push(CalendarEvent::new(
                    format!("sponsor-{}-{}", key, id),
                    format!("{}: {}", label, brand),
                    date,
                    None,
                    SPONSOR_COLOR,
                ));
            }
        }
    }

    let mut stmt = conn.prepare(
        "SELECT id, title, due_date FROM milestones
         WHERE due_date BETWEEN ? AND ?
         ORDER BY due_date, id",
    )?;
    let rows = stmt.query_map([&start, &last], |r| {
        Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
    })?;
    for row in rows {
        let (id, title, due) = row?;
        events.push(CalendarEvent::new(
            format!("milestone-{}", id),
            format!("Milestone: {}", title),
            due,
            None,
            MILESTONE_COLOR,
        ));
    }

    let mut stmt = conn.prepare(
        "SELECT id, title, shoot_date FROM episodes
         WHERE stage = 'idea' AND shoot_date IS NOT NULL AND shoot_date BETWEEN ? AND ?
         ORDER BY shoot_date, id",
    )?;
    let rows = stmt.query_map([&start, &last], |r| {
        Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?, r.get::<_, String>(2)?))
    })?;
    for row in rows {
        let (id, title, shoot) = row?;
        events.push(CalendarEvent::new(
            format!("idea-{}", id),
            format!("IDEA: {}", title),
            shoot,
            None,
            IDEA_COLOR,
        ));
    }

    let mut stmt = conn.prepare(
        "SELECT id, title, target_shoot_start, target_shoot_end FROM series
         WHERE target_shoot_start IS NOT NULL AND target_shoot_end IS NOT NULL
           AND target_shoot_start <= ? AND target_shoot_end >= ?
         ORDER BY target_shoot_start, id",
    )?;
    let rows = stmt.query_map([&last, &start], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
        ))
    })?;
    for row in rows {
        let (id, title, shoot_start, shoot_end) = row?;
        events.push(CalendarEvent::new(
            format!("series-{}", id),
            format!("SERIES: {}", title),
            shoot_start,
            Some(shift(&shoot_end, 1)),
            SERIES_COLOR,
        ));
    }

    Ok(events)
}

async fn calendar(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Vec<CalendarEvent>>> {
    let (start, end) = calendar_window(&query, Local::now().date_naive());
    let conn = state.db()?;
    Ok(Json(calendar_events(&conn, start, end)?))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineTask {
    pub id: String,
    pub text: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub color: &'static str,
}

fn timeline_tasks(conn: &Connection) -> rusqlite::Result<Vec<TimelineTask>> {
    let mut tasks = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT id, title, status, target_shoot_start, target_shoot_end,
            actual_shoot_start, actual_shoot_end
         FROM series
         WHERE target_shoot_start IS NOT NULL OR actual_shoot_start IS NOT NULL
         ORDER BY COALESCE(actual_shoot_start, target_shoot_start), id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, Option<String>>(4)?,
            r.get::<_, Option<String>>(5)?,
            r.get::<_, Option<String>>(6)?,
        ))
    })?;
    for row in rows {
        let (id, title, status, target_start, target_end, actual_start, actual_end) = row?;
        let Some(start) = actual_start.or(target_start) else {
            continue;
        };
        let end = actual_end.or(target_end).unwrap_or_else(|| shift(&start, 7));
        tasks.push(TimelineTask {
            id: format!("s-{}", id),
            text: title,
            start_date: start,
            end_date: end,
            kind: "project",
            parent: None,
            color: series_status_color(status.as_deref().unwrap_or_default()),
        });
    }

    let mut stmt = conn.prepare(
        "SELECT id, series_id, title, stage, shoot_date, publish_date
         FROM episodes
         WHERE shoot_date IS NOT NULL OR publish_date IS NOT NULL
         ORDER BY COALESCE(shoot_date, publish_date), id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, Option<i64>>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, Option<String>>(3)?,
            r.get::<_, Option<String>>(4)?,
            r.get::<_, Option<String>>(5)?,
        ))
    })?;
    for row in rows {
        let (id, series_id, title, stage, shoot, publish) = row?;
        let Some(start) = shoot.or_else(|| publish.clone()) else {
            continue;
        };
        let end = publish.unwrap_or_else(|| shift(&start, 1));
        tasks.push(TimelineTask {
            id: format!("e-{}", id),
            text: title,
            start_date: start,
            end_date: end,
            kind: "task",
            parent: series_id.map(|s| format!("s-{}", s)),
            color: episode_stage_color(stage.as_deref().unwrap_or_default()),
        });
    }

    Ok(tasks)
}

async fn timeline(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let tasks = timeline_tasks(&conn)?;
    let milestones = query_json(
        &conn,
        "SELECT * FROM milestones WHERE due_date IS NOT NULL ORDER BY due_date, id",
        [],
    )?;
    Ok(Json(json!({ "tasks": tasks, "milestones": milestones })))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GanttRow {
    pub id: String,
    pub name: String,
    pub start: String,
    pub end: String,
    pub progress: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<String>,
    pub custom_class: String,
}

struct PhaseRow {
    id: i64,
    phase: String,
    start: String,
    end: String,
    status: String,
    episode_title: String,
    series_id: Option<i64>,
}

fn gantt_rows(conn: &Connection) -> rusqlite::Result<Vec<GanttRow>> {
    let mut stmt = conn.prepare(
        "SELECT ep.id, ep.phase, ep.start_date, ep.end_date, ep.status, e.title, e.series_id
         FROM episode_phases ep
         JOIN episodes e ON ep.episode_id = e.id
         ORDER BY e.series_id, e.id, ep.start_date, ep.id",
    )?;
    let phases = stmt
        .query_map([], |r| {
            Ok(PhaseRow {
                id: r.get(0)?,
                phase: r.get(1)?,
                start: r.get(2)?,
                end: r.get(3)?,
                status: r.get::<_, Option<String>>(4)?.unwrap_or_default(),
                episode_title: r.get(5)?,
                series_id: r.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, title, target_shoot_start, target_shoot_end, actual_shoot_start, actual_shoot_end
         FROM series ORDER BY id",
    )?;
    let series = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, Option<String>>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, Option<String>>(4)?,
                r.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    for (id, title, target_start, target_end, actual_start, actual_end) in series {
        let own: Vec<&PhaseRow> = phases.iter().filter(|p| p.series_id == Some(id)).collect();
        let derived_start = own.iter().map(|p| p.start.clone()).min();
        let derived_end = own.iter().map(|p| p.end.clone()).max();

        let Some(start) = derived_start.or(actual_start).or(target_start) else {
            continue;
        };
        let end = derived_end
            .or(actual_end)
            .or(target_end)
            .unwrap_or_else(|| shift(&start, 7));
        let progress = if own.is_empty() {
            0
        } else {
            let total: i64 = own.iter().map(|p| phase_progress(&p.status)).sum();
            (total as f64 / own.len() as f64).round() as i64
        };

        rows.push(GanttRow {
            id: format!("series-{}", id),
            name: title,
            start,
            end,
            progress,
            dependencies: None,
            custom_class: "gantt-parent".to_string(),
        });
        for p in own {
            rows.push(GanttRow {
                id: format!("phase-{}", p.id),
                name: format!("- {} - {}", p.episode_title, p.phase.to_uppercase()),
                start: p.start.clone(),
                end: p.end.clone(),
                progress: phase_progress(&p.status),
                dependencies: Some(format!("series-{}", id)),
                custom_class: format!("phase-{}", p.phase),
            });
        }
    }
    Ok(rows)
}

async fn gantt(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    Ok(Json(json!({ "tasks": gantt_rows(&conn)? })))
}
