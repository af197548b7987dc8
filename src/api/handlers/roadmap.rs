use std::sync::Arc;

use axum::{
    extract::{Query as QueryParams, State},
    routing::get,
    Json, Router,
};
use rusqlite::Connection;

use crate::alerts::parse_day;
use crate::api::error::ApiResult;
use crate::api::helpers::{today, Query};
use crate::api::state::AppState;
use crate::roadmap::{self, EpisodeInput, Roadmap, SeriesInput};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/roadmap", get(read))
}

/// Active series with unscheduled ones last, and their scheduled episode slots.
fn load_inputs(conn: &Connection) -> rusqlite::Result<(Vec<SeriesInput>, Vec<EpisodeInput>)> {
    let mut stmt = conn.prepare(
        "SELECT id, title, target_shoot_start
         FROM series
         WHERE status NOT IN ('published', 'archived')
         ORDER BY
            CASE WHEN target_shoot_start IS NULL THEN 1 ELSE 0 END,
            target_shoot_start,
            id",
    )?;
    let series = stmt
        .query_map([], |r| {
            Ok(SeriesInput {
                id: r.get(0)?,
                title: r.get(1)?,
                target_shoot_start: parse_day(r.get::<_, Option<String>>(2)?.as_deref()),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare(
        "SELECT id, series_id, title, episode_type
         FROM episodes
         WHERE episode_type IN ('cornerstone', 'filler') AND series_id IS NOT NULL
         ORDER BY sort_order, id",
    )?;
    let episodes = stmt
        .query_map([], |r| {
            Ok(EpisodeInput {
                id: r.get(0)?,
                series_id: r.get(1)?,
                title: r.get(2)?,
                episode_type: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((series, episodes))
}

async fn read(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Roadmap>> {
    let producers = query
        .get("producers")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1);
    let today = today(&query)?;
    let (series, episodes) = {
        let conn = state.db()?;
        load_inputs(&conn)?
    };
    Ok(Json(roadmap::build(&series, &episodes, producers, today)))
}
