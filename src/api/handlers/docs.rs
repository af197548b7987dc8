use std::sync::Arc;

use axum::{
    extract::{Query as QueryParams, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::api::helpers::Query;
use crate::api::state::AppState;
use crate::docs::{self, DocError};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/docs", get(read))
}

impl From<DocError> for ApiError {
    fn from(err: DocError) -> Self {
        match err {
            DocError::InvalidId => ApiError::bad_request("Invalid document id"),
            DocError::NotFound => ApiError::not_found("Document"),
            DocError::Io(e) => ApiError::Internal(e.into()),
        }
    }
}

/// Lists the workspace docs, or returns one of them with `?id=`.
async fn read(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<Query>,
) -> ApiResult<Json<Value>> {
    let Some(root) = state.config.docs_root.as_deref() else {
        if query.contains_key("id") {
            return Err(ApiError::not_found("Document"));
        }
        return Ok(Json(json!([])));
    };

    if let Some(id) = query.get("id") {
        let doc = docs::read(root, id).inspect_err(|e| {
            if let DocError::InvalidId = e {
                warn!(%id, "rejected document id");
            }
        })?;
        return Ok(Json(json!(doc)));
    }

    Ok(Json(json!(docs::list(root)?)))
}
