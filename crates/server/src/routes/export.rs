// crates/server/src/routes/export.rs
//! POST /export - spreadsheet export proxy.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Router;

use super::ApiJson;
use crate::error::{ApiError, ApiResult};
use crate::proxy::UpstreamResponse;
use crate::state::AppState;

/// Forwards any JSON object unchanged; the sheet script owns the schema.
async fn export(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<serde_json::Value>,
) -> ApiResult<UpstreamResponse> {
    if !payload.is_object() {
        return Err(ApiError::BadRequest("Export body must be a JSON object".to_string()));
    }
    Ok(state.proxy.export(&payload).await?)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/export", post(export))
}
