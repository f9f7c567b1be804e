// crates/core/src/ai/openai.rs
//! OpenAI-compatible HTTP client for chat, transcription and speech.
//!
//! One client serves all three traits since they share a base URL, key and
//! connection pool. Any server exposing `/chat/completions`,
//! `/audio/transcriptions` and `/audio/speech` works.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::config::AiConfig;
use super::provider::{ChatProvider, SpeechToText, TextToSpeech};
use super::types::{
    AiError, AudioInput, CompletionRequest, CompletionResponse, ResponseFormat,
};
use crate::text::truncate;

const CHAT: &str = "chat";
const TRANSCRIPTION: &str = "transcription";
const SPEECH: &str = "speech";

/// Upstream error bodies are logged up to this many bytes.
const LOGGED_BODY_LIMIT: usize = 500;

pub struct OpenAiClient {
    http: reqwest::Client,
    config: AiConfig,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAiClient {
    pub fn new(config: AiConfig) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AiError::Transport {
                service: "client",
                message: e.to_string(),
            })?;
        tracing::info!(
            base_url = %config.base_url,
            chat_model = %config.chat_model,
            stt_model = %config.stt_model,
            tts_model = %config.tts_model,
            "AI client configured"
        );
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send with the bearer key attached; non-2xx becomes `AiError::Upstream`.
    async fn send(
        &self,
        service: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AiError> {
        let response = request
            .bearer_auth(self.config.api_key.expose())
            .send()
            .await
            .map_err(|e| self.transport_error(service, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                service,
                status = status.as_u16(),
                body = %truncate(&body, LOGGED_BODY_LIMIT),
                "AI service returned an error status"
            );
            return Err(AiError::Upstream {
                service,
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn transport_error(&self, service: &'static str, err: reqwest::Error) -> AiError {
        if err.is_timeout() {
            tracing::error!(service, timeout_secs = self.config.timeout_secs, "AI request timed out");
            AiError::Timeout(self.config.timeout_secs)
        } else {
            tracing::error!(service, error = %err, "AI request failed");
            AiError::Transport {
                service,
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AiError> {
        let start = Instant::now();

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.user_prompt }));

        let mut body = serde_json::json!({
            "model": self.config.chat_model,
            "messages": messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });
        if request.response_format == ResponseFormat::Json {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let response = self
            .send(CHAT, self.http.post(self.url("chat/completions")).json(&body))
            .await?;
        let parsed: ChatResponse = response.json().await.map_err(|e| AiError::ParseFailed {
            service: CHAT,
            message: e.to_string(),
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AiError::ParseFailed {
                service: CHAT,
                message: "response contained no message content".into(),
            })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(latency_ms, content_len = content.len(), "chat completion received");

        Ok(CompletionResponse {
            content,
            model: parsed.model,
            input_tokens: parsed.usage.as_ref().and_then(|u| u.prompt_tokens),
            output_tokens: parsed.usage.as_ref().and_then(|u| u.completion_tokens),
            latency_ms,
        })
    }

    fn model(&self) -> &str {
        &self.config.chat_model
    }
}

#[async_trait]
impl SpeechToText for OpenAiClient {
    async fn transcribe(&self, audio: AudioInput) -> Result<String, AiError> {
        let audio_len = audio.bytes.len();
        let part = Part::bytes(audio.bytes)
            .file_name(audio.filename)
            .mime_str(&audio.mime_type)
            .map_err(|e| AiError::Transport {
                service: TRANSCRIPTION,
                message: e.to_string(),
            })?;
        let form = Form::new()
            .text("model", self.config.stt_model.clone())
            .part("file", part);

        let response = self
            .send(
                TRANSCRIPTION,
                self.http.post(self.url("audio/transcriptions")).multipart(form),
            )
            .await?;
        let parsed: TranscriptionResponse =
            response.json().await.map_err(|e| AiError::ParseFailed {
                service: TRANSCRIPTION,
                message: e.to_string(),
            })?;

        let text = parsed.text.trim().to_string();
        tracing::debug!(audio_len, text_len = text.len(), "transcription received");
        Ok(text)
    }
}

#[async_trait]
impl TextToSpeech for OpenAiClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AiError> {
        let body = serde_json::json!({
            "model": self.config.tts_model,
            "voice": self.config.tts_voice,
            "input": text,
            "response_format": "mp3",
        });
        let response = self
            .send(SPEECH, self.http.post(self.url("audio/speech")).json(&body))
            .await?;
        let bytes = response.bytes().await.map_err(|e| self.transport_error(SPEECH, e))?;
        tracing::debug!(text_len = text.len(), audio_len = bytes.len(), "speech synthesized");
        Ok(bytes.to_vec())
    }
}
