// crates/core/src/ai/config.rs
//! AI client configuration types.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A credential that must never reach logs or API responses.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for injecting into an outbound request.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

impl FromStr for Secret {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// Configuration for the OpenAI-compatible client.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Secret,
    pub base_url: String,
    pub chat_model: String,
    pub stt_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub timeout_secs: u64,
}

impl AiConfig {
    pub fn new(api_key: Secret) -> Self {
        Self {
            api_key,
            ..Self::default()
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: Secret::new(""),
            base_url: "https://api.openai.com/v1".into(),
            chat_model: "gpt-4o-mini".into(),
            stt_model: "whisper-1".into(),
            tts_model: "tts-1".into(),
            tts_voice: "alloy".into(),
            timeout_secs: 60,
        }
    }
}
