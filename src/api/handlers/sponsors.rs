use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query as QueryParams, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Json, Router,
};
use rusqlite::{Connection, OptionalExtension, Row};
use serde_json::Value;
use tracing::info;

use crate::alerts::{derive_alerts, SponsorDates};
use crate::api::error::{ApiError, ApiResult};
use crate::api::helpers::{
    check_not_null, check_opt_one_of, created, delete_row, fetch_by_id, ok_true, opt_f64, opt_i64,
    opt_str, parse_body, required_str, today, Body, Filters, Patch, Query,
};
use crate::api::state::AppState;
use crate::db::query_json;
use crate::invoice::{self, InvoiceSource, Issuer};
use crate::pipeline::{normalize_sub_status, DEAL_TYPES, SCRIPT_STATUSES, STAGES};

const NET_SHARE: f64 = 0.8;

const EDITABLE: [&str; 57] = [
    "brand_name",
    "deal_type",
    "deal_value_gross",
    "deal_value_net",
    "cpm_rate",
    "cpm_cap",
    "mvg",
    "stage",
    "sub_status",
    "contact_name",
    "contact_email",
    "agency_name",
    "agency_contact",
    "offer_date",
    "contract_date",
    "brief_due",
    "brief_received_date",
    "script_due",
    "film_by",
    "rough_cut_due",
    "brand_review_due",
    "live_date",
    "invoice_date",
    "payment_due_date",
    "payment_received_date",
    "payment_terms_brand_days",
    "payment_terms_agency_days",
    "invoice_amount",
    "placement",
    "integration_length_seconds",
    "brief_text",
    "brief_link",
    "script_draft",
    "script_status",
    "has_tracking_link",
    "has_pinned_comment",
    "has_qr_code",
    "tracking_link",
    "promo_code",
    "youtube_video_id",
    "youtube_video_title",
    "views_at_30_days",
    "cpm_screenshot_taken",
    "cpm_invoice_generated",
    "mvg_met",
    "make_good_required",
    "make_good_video_id",
    "exclusivity_window_days",
    "exclusivity_category",
    "requires_product",
    "product_ordered_date",
    "product_ship_to",
    "product_received",
    "episode_id",
    "notes",
    "next_action",
    "next_action_due",
];

const WITH_EPISODE: &str = "
    SELECT
        sponsors.*,
        episodes.title AS episode_title,
        episodes.view_count AS episode_view_count,
        episodes.view_count_updated_at AS episode_view_count_updated_at,
        episodes.youtube_video_id AS episode_youtube_video_id,
        episodes.youtube_url AS episode_youtube_url,
        episodes.thumbnail_url AS episode_thumbnail_url,
        episodes.actual_publish_date AS episode_publish_date,
        episodes.publish_date AS episode_target_publish_date
    FROM sponsors
    LEFT JOIN episodes ON sponsors.episode_id = episodes.id";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sponsors", get(list).post(create))
        .route("/api/sponsors/alerts", get(alerts))
        .route("/api/sponsors/:id", get(read).put(update).delete(remove))
        .route("/api/sponsors/:id/invoice", get(invoice_page))
}

fn check_enums(body: &Body) -> ApiResult<()> {
    check_opt_one_of(body, "stage", &STAGES)?;
    check_opt_one_of(body, "deal_type", &DEAL_TYPES)?;
    check_opt_one_of(body, "script_status", &SCRIPT_STATUSES)?;
    Ok(())
}

fn read_joined(conn: &Connection, id: i64) -> ApiResult<Value> {
    let sql = format!("{} WHERE sponsors.id = ?", WITH_EPISODE);
    fetch_by_id(conn, &sql, id, "Sponsor")
}

async fn list(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let mut filters = Filters::new();
    filters.from_query(&query, "stage", "sponsors.stage = ?");
    let sql = format!(
        "{}{} ORDER BY sponsors.created_at DESC, sponsors.id DESC",
        WITH_EPISODE,
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
    let brand = required_str(&body, "brand_name")?;
    check_enums(&body)?;

    let gross = opt_f64(&body, "deal_value_gross").unwrap_or(0.0);
    let net = opt_f64(&body, "deal_value_net")
        .filter(|n| *n != 0.0)
        .unwrap_or(gross * NET_SHARE);
    let stage = opt_str(&body, "stage").unwrap_or_else(|| "leads".into());
    let sub_status = normalize_sub_status(&stage, opt_str(&body, "sub_status").as_deref());
    let date = |key: &str| opt_str(&body, key).filter(|s| !s.is_empty());

    let conn = state.db()?;
    conn.execute(
        "INSERT INTO sponsors(
            brand_name, deal_type, deal_value_gross, deal_value_net, stage, sub_status,
            contact_name, contact_email, agency_name, agency_contact,
            offer_date, script_due, live_date, placement,
            integration_length_seconds, notes, brief_text,
            payment_terms_brand_days, payment_terms_agency_days,
            cpm_rate, cpm_cap, mvg, episode_id, next_action, next_action_due
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            brand,
            opt_str(&body, "deal_type").unwrap_or_else(|| "flat_rate".into()),
            gross,
            net,
            stage,
            sub_status,
            opt_str(&body, "contact_name").unwrap_or_default(),
            opt_str(&body, "contact_email").unwrap_or_default(),
            opt_str(&body, "agency_name").unwrap_or_default(),
            opt_str(&body, "agency_contact").unwrap_or_default(),
            date("offer_date"),
            date("script_due"),
            date("live_date"),
            opt_str(&body, "placement").unwrap_or_else(|| "first_5_min".into()),
            opt_i64(&body, "integration_length_seconds").filter(|n| *n != 0).unwrap_or(60),
            opt_str(&body, "notes").unwrap_or_default(),
            opt_str(&body, "brief_text").unwrap_or_default(),
            opt_i64(&body, "payment_terms_brand_days").unwrap_or(30),
            opt_i64(&body, "payment_terms_agency_days").unwrap_or(15),
            opt_f64(&body, "cpm_rate").filter(|n| *n != 0.0),
            opt_f64(&body, "cpm_cap").filter(|n| *n != 0.0),
            opt_i64(&body, "mvg").filter(|n| *n != 0),
            opt_i64(&body, "episode_id"),
            opt_str(&body, "next_action").unwrap_or_default(),
            date("next_action_due"),
        ],
    )?;
    let id = conn.last_insert_rowid();
    info!(sponsor_id = id, %stage, "sponsor created");
    Ok(created(fetch_by_id(&conn, "SELECT * FROM sponsors WHERE id = ?", id, "Sponsor")?))
}

async fn read(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    Ok(Json(read_joined(&conn, id)?))
}

async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let body = parse_body(&body)?;
    check_not_null(&body, &["brand_name"])?;
    check_enums(&body)?;
    let mut patch = Patch::from_body(&body, &EDITABLE);
    patch.require_fields()?;

    let conn = state.db()?;
    let current: Option<(String, Option<String>)> = conn
        .query_row(
            "SELECT stage, sub_status FROM sponsors WHERE id = ?",
            [id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((current_stage, current_sub)) = current else {
        return Err(ApiError::not_found("Sponsor"));
    };

    let has_stage = body.contains_key("stage");
    if has_stage || body.contains_key("sub_status") {
        let stage = opt_str(&body, "stage").unwrap_or(current_stage);
        let requested = if body.contains_key("sub_status") {
            opt_str(&body, "sub_status")
        } else {
            current_sub
        };
        patch.set("sub_status", normalize_sub_status(&stage, requested.as_deref()));
    }
    patch.touch("updated_at");
    patch.apply(&conn, "sponsors", id)?;
    info!(sponsor_id = id, "sponsor updated");

    Ok(Json(read_joined(&conn, id)?))
}

async fn remove(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Value>> {
    let conn = state.db()?;
    delete_row(&conn, "sponsors", id, "Sponsor")?;
    info!(sponsor_id = id, "sponsor deleted");
    Ok(ok_true())
}

fn sponsor_dates(r: &Row<'_>) -> rusqlite::Result<SponsorDates> {
    Ok(SponsorDates {
        id: r.get("id")?,
        brand_name: r.get("brand_name")?,
        stage: r.get::<_, Option<String>>("stage")?.unwrap_or_default(),
        sub_status: r.get("sub_status")?,
        deal_type: r.get::<_, Option<String>>("deal_type")?.unwrap_or_default(),
        script_due: r.get("script_due")?,
        live_date: r.get("live_date")?,
        payment_due_date: r.get("payment_due_date")?,
        payment_received_date: r.get("payment_received_date")?,
        next_action_due: r.get("next_action_due")?,
    })
}

async fn alerts(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let today = today(&query)?;
    let conn = state.db()?;
    let mut stmt = conn.prepare(
        "SELECT id, brand_name, stage, sub_status, deal_type, script_due, live_date,
            payment_due_date, payment_received_date, next_action_due
         FROM sponsors
         WHERE stage != 'paid'
         ORDER BY id",
    )?;
    let sponsors = stmt
        .query_map([], sponsor_dates)?
        .collect::<Result<Vec<_>, _>>()?;
    let alerts = derive_alerts(&sponsors, today);
    Ok(Json(serde_json::to_value(alerts).map_err(anyhow::Error::from)?))
}

fn text(r: &Row<'_>, col: &str) -> rusqlite::Result<String> {
    Ok(r.get::<_, Option<String>>(col)?.unwrap_or_default())
}

fn invoice_source(r: &Row<'_>) -> rusqlite::Result<InvoiceSource> {
    Ok(InvoiceSource {
        id: r.get("id")?,
        brand_name: text(r, "brand_name")?,
        deal_type: text(r, "deal_type")?,
        deal_value_gross: r.get::<_, Option<f64>>("deal_value_gross")?.unwrap_or(0.0),
        cpm_rate: r.get("cpm_rate")?,
        cpm_cap: r.get("cpm_cap")?,
        views_at_30_days: r.get::<_, Option<i64>>("views_at_30_days")?.unwrap_or(0),
        live_date: r.get("live_date")?,
        invoice_date: r.get("invoice_date")?,
        payment_due_date: r.get("payment_due_date")?,
        invoice_amount: r.get::<_, Option<f64>>("invoice_amount")?.unwrap_or(0.0),
        agency_contact: text(r, "agency_contact")?,
        contact_name: text(r, "contact_name")?,
        contact_email: text(r, "contact_email")?,
        youtube_video_id: text(r, "youtube_video_id")?,
        youtube_video_title: text(r, "youtube_video_title")?,
        payment_terms_brand_days: r
            .get::<_, Option<i64>>("payment_terms_brand_days")?
            .unwrap_or(0),
        payment_terms_agency_days: r
            .get::<_, Option<i64>>("payment_terms_agency_days")?
            .unwrap_or(0),
        notes: text(r, "notes")?,
        promo_code: text(r, "promo_code")?,
    })
}

async fn invoice_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Html<String>> {
    let today = today(&query)?;
    let source = {
        let conn = state.db()?;
        conn.query_row("SELECT * FROM sponsors WHERE id = ?", [id], invoice_source)
            .optional()?
            .ok_or_else(|| ApiError::not_found("Sponsor"))?
    };
    let issuer = Issuer {
        name: state.config.invoice_from.clone(),
        email: state.config.invoice_email.clone(),
    };
    let computed = invoice::compute(&source, today);
    info!(sponsor_id = id, number = %computed.number, "invoice rendered");
    Ok(Html(invoice::render(&source, &computed, &issuer, today)))
}
