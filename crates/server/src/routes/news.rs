// crates/server/src/routes/news.rs
//! GET /news - news search proxy.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;

use crate::error::{ApiError, ApiResult};
use crate::proxy::{NewsQuery, UpstreamResponse};
use crate::state::AppState;

async fn search_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsQuery>,
) -> ApiResult<UpstreamResponse> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required query parameter: q".to_string()))?;
    Ok(state.proxy.search_news(query, &params).await?)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/news", get(search_news))
}
