//! Channel media kit: editable channel facts plus sponsor stats.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, response::Html, routing::get, Json, Router};
use rusqlite::{types::Value as SqlValue, Connection};
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::helpers::{parse_body, to_sql, Patch};
use crate::api::state::AppState;
use crate::db::query_one_json;
use crate::html::{self, escape};

const TOP_BRANDS: i64 = 12;

const EDITABLE: [&str; 15] = [
    "youtube_handle",
    "channel_name",
    "subscriber_count",
    "avg_views_per_video",
    "avg_engagement_rate",
    "niche_description",
    "content_pillars",
    "audience_age_range",
    "audience_gender_split",
    "audience_top_geos",
    "posting_frequency",
    "channel_url",
    "instagram_handle",
    "tiktok_handle",
    "contact_email",
];
const JSON_FIELDS: [&str; 3] = ["content_pillars", "audience_gender_split", "audience_top_geos"];
const INT_FIELDS: [&str; 2] = ["subscriber_count", "avg_views_per_video"];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/media-kit", get(read).put(update))
        .route("/media-kit/preview", get(preview))
}

fn load_config(conn: &Connection) -> ApiResult<Value> {
    if let Some(row) = query_one_json(conn, "SELECT * FROM media_kit_config WHERE id = 1", [])? {
        return Ok(row);
    }
    conn.execute("INSERT OR IGNORE INTO media_kit_config(id) VALUES (1)", [])?;
    Ok(query_one_json(conn, "SELECT * FROM media_kit_config WHERE id = 1", [])?
        .unwrap_or(Value::Null))
}

fn top_brands(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT brand_name FROM sponsors
         WHERE stage = 'published' AND brand_name != ''
         ORDER BY deal_value_gross DESC
         LIMIT ?",
    )?;
    let rows = stmt.query_map([TOP_BRANDS], |r| r.get::<_, String>(0))?;
    rows.collect()
}

fn load_stats(conn: &Connection) -> rusqlite::Result<Value> {
    let (count, total): (i64, f64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(deal_value_gross), 0)
         FROM sponsors WHERE stage = 'published'",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let avg = if count > 0 { total / count as f64 } else { 0.0 };
    Ok(json!({
        "total_sponsors": count,
        "total_revenue": total,
        "avg_deal_value": avg,
        "top_brands": top_brands(conn)?,
    }))
}

async fn read(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    Ok(Json(json!({
        "config": load_config(&conn)?,
        "stats": load_stats(&conn)?,
    })))
}

/// JSON-typed fields are kept as text and counts are whole numbers.
fn normalize(key: &str, value: &Value) -> SqlValue {
    if JSON_FIELDS.contains(&key) {
        return match value {
            Value::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::Text(other.to_string()),
        };
    }
    if INT_FIELDS.contains(&key) {
        let n = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        return n.map_or(SqlValue::Null, |f| SqlValue::Integer(f.round() as i64));
    }
    if key == "avg_engagement_rate" {
        if let Value::String(s) = value {
            return s.trim().parse::<f64>().map_or(SqlValue::Null, SqlValue::Real);
        }
    }
    to_sql(value)
}

async fn update(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    let mut patch = Patch::new();
    for key in EDITABLE {
        if let Some(v) = body.get(key) {
            patch.set(key, normalize(key, v));
        }
    }

    let conn = state.db()?;
    if !patch.is_empty() {
        patch.touch("updated_at");
        patch.apply(&conn, "media_kit_config", 1_i64)?;
        info!("media kit updated");
    }
    Ok(Json(json!({ "config": load_config(&conn)? })))
}

/// `1234` -> `1,234`, `85000` -> `85K`, `1500000` -> `1.5M`.
fn compact(n: i64) -> String {
    let trim = |s: String| s.strip_suffix(".0").map(str::to_string).unwrap_or(s);
    let f = n as f64;
    if n >= 1_000_000 {
        format!("{}M", trim(format!("{:.1}", f / 1_000_000.0)))
    } else if n >= 100_000 {
        format!("{}K", (f / 1_000.0).round())
    } else if n >= 1_000 {
        format!("{}K", trim(format!("{:.1}", f / 1_000.0)))
    } else {
        html::thousands(n)
    }
}

fn text_list(raw: Option<&str>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
        .unwrap_or_default()
}

const PREVIEW_STYLE: &str = "
* { box-sizing: border-box; }
body { margin: 0; background: #0d1117; color: #e6edf3; font-family: Inter, system-ui, sans-serif; }
.wrap { max-width: 900px; margin: 0 auto; padding: 40px 24px; }
.kicker { font-size: 14px; font-weight: 600; color: #f0a500; letter-spacing: 2px; text-transform: uppercase; }
h1 { font-size: 42px; font-weight: 800; margin: 8px 0; }
.dim { color: #8b949e; }
.header { text-align: center; margin-bottom: 48px; }
.grid { display: grid; grid-template-columns: repeat(4, 1fr); gap: 16px; margin-bottom: 40px; }
.card { background: #161b22; border-radius: 12px; border: 1px solid #30363d; padding: 24px; text-align: center; }
.stat { font-size: 32px; font-weight: 800; color: #f0a500; }
.label { font-size: 12px; color: #8b949e; margin-top: 4px; text-transform: uppercase; letter-spacing: 1px; }
.section { font-size: 13px; font-weight: 700; text-transform: uppercase; letter-spacing: 1.5px; color: #f0a500; margin-bottom: 16px; }
.brands { display: flex; flex-wrap: wrap; gap: 10px; margin-bottom: 40px; }
.brand { background: #161b22; border: 1px solid #30363d; border-radius: 8px; padding: 8px 16px; font-weight: 600; }
a { color: #8b949e; text-decoration: none; }
";

fn render_preview(config: &Value, brands: &[String]) -> String {
    let field = |key: &str| config.get(key).and_then(Value::as_str).unwrap_or_default();
    let number = |key: &str| config.get(key).and_then(Value::as_i64).unwrap_or(0);
    let engagement = config
        .get("avg_engagement_rate")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    let mut body = String::from("<div class=\"wrap\">\n");
    body.push_str(&format!(
        "<div class=\"header\"><div class=\"kicker\">Media Kit</div><h1>{}</h1>\
         <p class=\"dim\"><a href=\"{}\">{}</a></p><p class=\"dim\">{}</p></div>\n",
        escape(field("channel_name")),
        escape(field("channel_url")),
        escape(field("youtube_handle")),
        escape(field("niche_description")),
    ));

    let stats = [
        ("Subscribers", compact(number("subscriber_count"))),
        ("Avg Views", compact(number("avg_views_per_video"))),
        ("Engagement", format!("{:.1}%", engagement)),
        ("Posting", field("posting_frequency").to_string()),
    ];
    body.push_str("<div class=\"grid\">\n");
    for (label, value) in stats {
        body.push_str(&format!(
            "<div class=\"card\"><div class=\"stat\">{}</div><div class=\"label\">{}</div></div>\n",
            escape(&value),
            label
        ));
    }
    body.push_str("</div>\n");

    let pillars = text_list(config.get("content_pillars").and_then(Value::as_str));
    if !pillars.is_empty() {
        body.push_str("<div class=\"section\">Content Pillars</div>\n<div class=\"grid\">\n");
        for p in &pillars {
            body.push_str(&format!("<div class=\"card\">{}</div>\n", escape(p)));
        }
        body.push_str("</div>\n");
    }

    let geos = text_list(config.get("audience_top_geos").and_then(Value::as_str));
    body.push_str(&format!(
        "<div class=\"section\">Audience</div>\n<p>Ages {}{}</p>\n",
        escape(field("audience_age_range")),
        if geos.is_empty() {
            String::new()
        } else {
            format!(" &middot; {}", escape(&geos.join(", ")))
        }
    ));

    if !brands.is_empty() {
        body.push_str("<div class=\"section\">Brand Partners</div>\n<div class=\"brands\">\n");
        for b in brands {
            body.push_str(&format!("<span class=\"brand\">{}</span>\n", escape(b)));
        }
        body.push_str("</div>\n");
    }

    let socials = [
        ("Email", field("contact_email")),
        ("Instagram", field("instagram_handle")),
        ("TikTok", field("tiktok_handle")),
    ];
    body.push_str("<div class=\"section\">Contact</div>\n<p>");
    let parts: Vec<String> = socials
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("<strong>{}:</strong> {}", k, escape(v)))
        .collect();
    body.push_str(&parts.join(" &middot; "));
    body.push_str("</p>\n</div>");

    html::document(
        &format!("{} Media Kit", field("channel_name")),
        PREVIEW_STYLE,
        &body,
    )
}

async fn preview(State(state): State<Arc<AppState>>) -> ApiResult<Html<String>> {
    let (config, brands) = {
        let conn = state.db()?;
        (load_config(&conn)?, top_brands(&conn)?)
    };
    Ok(Html(render_preview(&config, &brands)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    #[test]
    fn compact_counts() {
        assert_eq!(compact(950), "950");
        assert_eq!(compact(1_500), "1.5K");
        assert_eq!(compact(2_000), "2K");
        assert_eq!(compact(190_000), "190K");
        assert_eq!(compact(1_000_000), "1M");
        assert_eq!(compact(2_360_000), "2.4M");
    }

    #[test]
    fn normalizes_json_and_integer_fields() {
        assert_eq!(
            normalize("content_pillars", &json!(["Food", "Travel"])),
            SqlValue::Text(r#"["Food","Travel"]"#.into())
        );
        assert_eq!(
            normalize("subscriber_count", &json!(1234.6)),
            SqlValue::Integer(1235)
        );
        assert_eq!(
            normalize("avg_views_per_video", &json!("900")),
            SqlValue::Integer(900)
        );
        assert_eq!(
            normalize("avg_engagement_rate", &json!("4.5")),
            SqlValue::Real(4.5)
        );
        assert_eq!(
            normalize("channel_name", &json!("Road Eats")),
            SqlValue::Text("Road Eats".into())
        );
    }

    #[test]
    fn stats_cover_published_sponsors_only() {
        let conn = open_in_memory().expect("db");
        for (brand, gross, stage) in [
            ("Nord", 5000.0, "published"),
            ("Acme", 3000.0, "published"),
            ("Later", 9000.0, "leads"),
        ] {
            conn.execute(
                "INSERT INTO sponsors(brand_name, deal_value_gross, stage) VALUES (?, ?, ?)",
                rusqlite::params![brand, gross, stage],
            )
            .expect("insert");
        }
        let stats = load_stats(&conn).expect("stats");
        assert_eq!(stats["total_sponsors"], 2);
        assert_eq!(stats["total_revenue"], 8000.0);
        assert_eq!(stats["avg_deal_value"], 4000.0);
        assert_eq!(stats["top_brands"], json!(["Nord", "Acme"]));
    }

    #[test]
    fn preview_lists_pillars_and_brands() {
        let conn = open_in_memory().expect("db");
        let config = load_config(&conn).expect("config");
        let page = render_preview(&config, &["Nord & Co".to_string()]);
        assert!(page.contains("Extreme Food"));
        assert!(page.contains("190K"));
        assert!(page.contains("Nord &amp; Co"));
    }
}
