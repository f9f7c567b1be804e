// crates/core/src/ai/types.rs
//! Request/response/error types for the AI service clients.

use thiserror::Error;

/// Request for a general-purpose chat completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub response_format: ResponseFormat,
}

impl CompletionRequest {
    /// Plain-text completion with defaults suited to short answers.
    pub fn text(user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            user_prompt: user_prompt.into(),
            max_tokens: 400,
            temperature: 0.7,
            response_format: ResponseFormat::Text,
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }
}

/// Desired response format for a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    Json,
}

/// Response from a chat completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub model: Option<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub latency_ms: u64,
}

/// An audio clip handed to the speech-to-text service.
#[derive(Debug, Clone)]
pub struct AudioInput {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl AudioInput {
    /// Browser `MediaRecorder` output, which is what the frontend uploads.
    pub fn webm(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            filename: "question.webm".into(),
            mime_type: "audio/webm".into(),
        }
    }
}

/// Errors that can occur while talking to an AI service.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("Request to {service} failed: {message}")]
    Transport { service: &'static str, message: String },

    #[error("{service} returned HTTP {status}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to parse {service} response: {message}")]
    ParseFailed { service: &'static str, message: String },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),
}

impl AiError {
    /// Short description safe to show a client: no transport text, URLs,
    /// upstream bodies or parser messages.
    pub fn summary(&self) -> String {
        match self {
            AiError::Transport { service, .. } => format!("{service} unreachable"),
            AiError::Upstream { service, status, .. } => format!("{service} returned HTTP {status}"),
            AiError::ParseFailed { service, .. } => format!("{service} response unreadable"),
            AiError::Timeout(secs) => format!("timed out after {secs} seconds"),
        }
    }
}
