// crates/server/src/routes/tts.rs
//! POST /tts - text-to-speech proxy.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::Router;
use serde::Deserialize;

use super::ApiJson;
use crate::error::{ApiError, ApiResult};
use crate::proxy::{UpstreamResponse, MAX_TTS_CHARS};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub voice_id: Option<String>,
}

async fn text_to_speech(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<TtsRequest>,
) -> ApiResult<UpstreamResponse> {
    let text = request.text.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Missing required field: text".to_string()));
    }
    if text.chars().count() > MAX_TTS_CHARS {
        return Err(ApiError::BadRequest(format!(
            "text exceeds {MAX_TTS_CHARS} characters"
        )));
    }
    Ok(state
        .proxy
        .text_to_speech(text, request.voice_id.as_deref())
        .await?)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/tts", post(text_to_speech))
}
