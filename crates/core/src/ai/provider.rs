// crates/core/src/ai/provider.rs
//! Traits for the three AI services the app depends on.

use async_trait::async_trait;

use super::types::{AiError, AudioInput, CompletionRequest, CompletionResponse};

/// Chat-completion service (carousel copy, voice answers).
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run a completion with an optional system prompt and a user prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AiError>;

    /// Model identifier for logging (e.g. "gpt-4o-mini").
    fn model(&self) -> &str;
}

/// Speech-recognition service.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe a recorded clip to text. The returned text is trimmed.
    async fn transcribe(&self, audio: AudioInput) -> Result<String, AiError>;
}

/// Speech-synthesis service.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize `text` to MP3 bytes.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AiError>;
}
