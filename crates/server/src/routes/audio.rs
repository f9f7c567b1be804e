// crates/server/src/routes/audio.rs
//! POST /audio-summary - narrate an article as MP3.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use newsdeck_core::ArticleContext;

use super::ApiJson;
use crate::error::ApiResult;
use crate::state::AppState;

async fn audio_summary(
    State(state): State<Arc<AppState>>,
    ApiJson(article): ApiJson<ArticleContext>,
) -> ApiResult<impl IntoResponse> {
    let audio = state.voice()?.audio_summary(&article).await?;
    tracing::debug!(audio_len = audio.len(), "audio summary synthesized");
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/audio-summary", post(audio_summary))
}
