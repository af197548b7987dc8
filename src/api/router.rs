use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method, StatusCode},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use super::handlers::{
    calendar, docs, episodes, field_contacts, health_council, hiring, media_kit,
    mission_control, pages, people, production, roadmap, series, sponsors, tasks,
};
use super::state::AppState;

fn cors(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => AllowOrigin::exact(value),
        Some(Err(_)) => {
            warn!(?origin, "invalid PRODHUB_CORS_ORIGIN, allowing any origin");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors(state.config.cors_origin.as_deref());
    Router::new()
        .merge(pages::routes())
        .merge(tasks::routes())
        .merge(people::routes())
        .merge(series::routes())
        .merge(episodes::routes())
        .merge(production::routes())
        .merge(sponsors::routes())
        .merge(media_kit::routes())
        .merge(field_contacts::routes())
        .merge(hiring::routes())
        .merge(mission_control::routes())
        .merge(health_council::routes())
        .merge(calendar::routes())
        .merge(roadmap::routes())
        .merge(docs::routes())
        .fallback(not_found)
        .layer(cors)
        .with_state(state)
}
