// crates/core/src/ai/mod.rs
//! AI service integration.
//!
//! Provides the `ChatProvider`, `SpeechToText` and `TextToSpeech` traits and
//! an OpenAI-compatible HTTP implementation of all three.

pub mod config;
pub mod openai;
pub mod provider;
pub mod types;

pub use config::{AiConfig, Secret};
pub use openai::OpenAiClient;
pub use provider::{ChatProvider, SpeechToText, TextToSpeech};
pub use types::{AiError, AudioInput, CompletionRequest, CompletionResponse, ResponseFormat};
