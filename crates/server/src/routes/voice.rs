// crates/server/src/routes/voice.rs
//! POST /voice-chat - spoken question about an article, spoken answer back.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use newsdeck_core::ai::AudioInput;
use newsdeck_core::ArticleContext;
use serde::{Deserialize, Serialize};

use super::ApiJson;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VoiceChatRequest {
    /// Base64 audio, optionally as a `data:` URL.
    pub audio: String,
    #[serde(flatten)]
    pub article: ArticleContext,
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct VoiceChatResponse {
    pub question: String,
    pub answer: String,
    /// Base64 MP3 of the spoken answer.
    pub audio: String,
}

/// Decode base64 audio, accepting a `data:audio/webm;base64,` prefix.
fn decode_audio(encoded: &str) -> ApiResult<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| ApiError::BadRequest(format!("audio is not valid base64: {e}")))
}

async fn voice_chat(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<VoiceChatRequest>,
) -> ApiResult<Json<VoiceChatResponse>> {
    let pipeline = state.voice()?;
    let bytes = decode_audio(&request.audio)?;
    let reply = pipeline
        .voice_chat(AudioInput::webm(bytes), &request.article)
        .await?;

    Ok(Json(VoiceChatResponse {
        question: reply.question,
        answer: reply.answer,
        audio: STANDARD.encode(&reply.audio),
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/voice-chat", post(voice_chat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn post(body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = router()
            .with_state(test_state())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/voice-chat")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn test_decode_audio_accepts_data_url() {
        let encoded = STANDARD.encode(b"hello");
        assert_eq!(decode_audio(&encoded).unwrap(), b"hello");
        let data_url = format!("data:audio/webm;codecs=opus;base64,{encoded}");
        assert_eq!(decode_audio(&data_url).unwrap(), b"hello");
        assert!(decode_audio("%%%").is_err());
    }

    #[tokio::test]
    async fn test_voice_chat_returns_full_triple() {
        let (status, json) = post(serde_json::json!({
            "audio": STANDARD.encode(b"Can I run it locally?"),
            "title": "Small model",
            "summary": "A 3B model beats last year's 70B.",
        }))
        .await;

        assert_eq!(status, StatusCode::OK);
        let reply: VoiceChatResponse = serde_json::from_value(json).unwrap();
        assert_eq!(reply.question, "Can I run it locally?");
        assert_eq!(reply.answer, "It runs locally.");
        assert_eq!(STANDARD.decode(reply.audio).unwrap(), b"mp3:It runs locally.");
    }

    #[tokio::test]
    async fn test_invalid_base64_is_400() {
        let (status, json) = post(serde_json::json!({
            "audio": "not base64!!",
            "title": "t",
            "summary": "s",
        }))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["details"].as_str().unwrap().contains("base64"));
    }

    #[tokio::test]
    async fn test_empty_audio_is_400() {
        let (status, _) = post(serde_json::json!({ "audio": "", "title": "t", "summary": "s" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
