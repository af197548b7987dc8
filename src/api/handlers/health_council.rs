//! Daily system health reports posted by the review council, plus a viewer.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query as QueryParams, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::error::ApiResult;
use crate::api::helpers::Query;
use crate::api::state::AppState;
use crate::html::{self, escape};

const DEFAULT_HISTORY_DAYS: i64 = 7;
const MAX_HISTORY_DAYS: i64 = 30;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health-council/reports", post(save_report))
        .route("/api/health-council/latest", get(latest))
        .route("/api/health-council/history", get(history))
        .route("/health-council", get(page))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HealthArea {
    name: String,
    icon: String,
    status: String,
    summary: String,
    details: Vec<String>,
    agent: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Recommendation {
    number: i64,
    severity: String,
    text: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Report {
    date: String,
    overall_score: f64,
    areas: Vec<HealthArea>,
    recommendations: Vec<Recommendation>,
}

/// Checks the shape the viewer relies on. Returns `(date, score)`.
fn validate(payload: &Value) -> Option<(&str, f64)> {
    let date = payload.get("date")?.as_str()?;
    let score = payload.get("overall_score")?.as_f64()?;
    payload.get("areas")?.as_array()?;
    Some((date, score))
}

fn upsert(conn: &Connection, date: &str, score: f64, payload: &Value) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO health_reports(date, overall_score, report_json)
         VALUES (?, ?, ?)
         ON CONFLICT(date) DO UPDATE SET
            overall_score = excluded.overall_score,
            report_json = excluded.report_json",
        rusqlite::params![date, score.round() as i64, payload.to_string()],
    )?;
    conn.query_row(
        "SELECT id FROM health_reports WHERE date = ?",
        [date],
        |r| r.get(0),
    )
}

fn rejected(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "ok": false, "error": message })),
    )
        .into_response()
}

async fn save_report(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<Response> {
    let Ok(payload) = serde_json::from_slice::<Value>(&body) else {
        return Ok(rejected("Invalid report payload"));
    };
    let Some((date, score)) = validate(&payload) else {
        warn!("rejected health report with invalid shape");
        return Ok(rejected("Invalid report payload"));
    };

    let conn = state.db()?;
    let id = upsert(&conn, date, score, &payload)?;
    info!(report_id = id, %date, score, "health report saved");
    Ok(Json(json!({ "ok": true, "id": id })).into_response())
}

/// Latest report payload plus the score of the one before it.
fn load_latest(conn: &Connection) -> rusqlite::Result<Option<(Value, Option<i64>)>> {
    let latest: Option<String> = conn
        .query_row(
            "SELECT report_json FROM health_reports ORDER BY date DESC LIMIT 1",
            [],
            |r| r.get(0),
        )
        .optional()?;
    let Some(raw) = latest else {
        return Ok(None);
    };
    let previous: Option<i64> = conn
        .query_row(
            "SELECT overall_score FROM health_reports ORDER BY date DESC LIMIT 1 OFFSET 1",
            [],
            |r| r.get(0),
        )
        .optional()?;
    let report = match serde_json::from_str(&raw) {
        Ok(report) => report,
        Err(error) => {
            warn!(%error, "stored health report is not valid JSON");
            Value::Null
        }
    };
    Ok(Some((report, previous)))
}

async fn latest(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let body = match load_latest(&conn)? {
        Some((report, previous)) => json!({ "report": report, "previousScore": previous }),
        None => json!({ "report": null, "previousScore": null }),
    };
    Ok(Json(body))
}

fn history_days(query: &Query) -> i64 {
    query
        .get("days")
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|n| *n != 0)
        .unwrap_or(DEFAULT_HISTORY_DAYS)
        .clamp(1, MAX_HISTORY_DAYS)
}

async fn history(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    let mut stmt = conn.prepare(
        "SELECT date, overall_score FROM health_reports ORDER BY date DESC LIMIT ?",
    )?;
    let mut rows = stmt
        .query_map([history_days(&query)], |r| {
            Ok(json!({
                "date": r.get::<_, String>(0)?,
                "overall_score": r.get::<_, i64>(1)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    rows.reverse();
    Ok(Json(json!({ "history": rows })))
}

const PAGE_STYLE: &str = "
body { margin: 0; background: #0d1117; color: #e6edf3; font-family: system-ui, sans-serif; }
.wrap { max-width: 960px; margin: 0 auto; padding: 32px 24px; }
.score { font-size: 56px; font-weight: 800; }
.delta { font-size: 16px; margin-left: 12px; }
.up { color: #3fb950; } .down { color: #f85149; } .flat { color: #8b949e; }
.areas { display: grid; grid-template-columns: repeat(2, 1fr); gap: 16px; margin-top: 24px; }
.area { background: #161b22; border: 1px solid #30363d; border-radius: 10px; padding: 16px; }
.area h3 { margin: 0 0 6px; font-size: 16px; }
.status { font-size: 11px; text-transform: uppercase; letter-spacing: 1px; padding: 2px 8px; border-radius: 999px; }
.healthy { background: #1f3d2a; color: #3fb950; }
.warning { background: #3d321a; color: #d29922; }
.critical { background: #3d1a1a; color: #f85149; }
.dim { color: #8b949e; font-size: 13px; }
ul { margin: 8px 0 0; padding-left: 18px; font-size: 13px; }
";

fn render_page(report: Option<&Report>, previous: Option<i64>) -> String {
    let Some(report) = report else {
        return html::document(
            "Health Council",
            PAGE_STYLE,
            "<div class=\"wrap\"><h1>Health Council</h1><p class=\"dim\">No reports yet.</p></div>",
        );
    };

    let score = report.overall_score.round() as i64;
    let delta = previous
        .map(|p| {
            let d = score - p;
            let class = match d.signum() {
                1 => "up",
                -1 => "down",
                _ => "flat",
            };
            format!("<span class=\"delta {}\">{:+} vs previous</span>", class, d)
        })
        .unwrap_or_default();

    let mut body = format!(
        "<div class=\"wrap\"><h1>Health Council</h1><div class=\"dim\">Report for {}</div>\n\
         <div><span class=\"score\">{}</span>{}</div>\n<div class=\"areas\">\n",
        escape(&report.date),
        score,
        delta
    );
    for area in &report.areas {
        let status = match area.status.as_str() {
            s @ ("healthy" | "warning" | "critical") => s,
            _ => "warning",
        };
        body.push_str(&format!(
            "<div class=\"area\"><h3>{} {}</h3><span class=\"status {}\">{}</span>\
             <p>{}</p>",
            escape(&area.icon),
            escape(&area.name),
            status,
            status,
            escape(&area.summary)
        ));
        if !area.details.is_empty() {
            body.push_str("<ul>");
            for d in &area.details {
                body.push_str(&format!("<li>{}</li>", escape(d)));
            }
            body.push_str("</ul>");
        }
        if !area.agent.is_empty() {
            body.push_str(&format!("<div class=\"dim\">{}</div>", escape(&area.agent)));
        }
        body.push_str("</div>\n");
    }
    body.push_str("</div>\n");

    if !report.recommendations.is_empty() {
        body.push_str("<h2>Recommendations</h2><ol>\n");
        for r in &report.recommendations {
            body.push_str(&format!(
                "<li value=\"{}\"><span class=\"status {}\">{}</span> {}</li>\n",
                r.number,
                escape(&r.severity),
                escape(&r.severity),
                escape(&r.text)
            ));
        }
        body.push_str("</ol>\n");
    }
    body.push_str("</div>");
    html::document("Health Council", PAGE_STYLE, &body)
}

async fn page(State(state): State<Arc<AppState>>) -> ApiResult<Html<String>> {
    let latest = {
        let conn = state.db()?;
        load_latest(&conn)?
    };
    let (report, previous) = match latest {
        Some((value, previous)) => (serde_json::from_value::<Report>(value).ok(), previous),
        None => (None, None),
    };
    Ok(Html(render_page(report.as_ref(), previous)))
}
