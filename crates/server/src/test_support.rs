// crates/server/src/test_support.rs
//! In-process fakes for router tests.

use std::sync::Arc;

use async_trait::async_trait;
use newsdeck_core::ai::{
    AiError, AudioInput, ChatProvider, CompletionRequest, CompletionResponse, ResponseFormat,
    SpeechToText, TextToSpeech,
};

use crate::jobs::RunnerConfig;
use crate::proxy::{ProxyClient, ProxyConfig};
use crate::state::{AiServices, AppState};

pub const SLIDES_JSON: &str = r#"{"slides":[
    {"heading":"What happened","body":"A new open model was released."},
    {"heading":"Why it matters","body":"It runs on a laptop."},
    {"heading":"What is next","body":"Expect fine-tunes within weeks."},
    {"heading":"Caveats","body":"Benchmarks are self-reported."}
]}"#;

/// Answers slide requests with [`SLIDES_JSON`] and anything else with a caption.
pub struct FakeChat;

#[async_trait]
impl ChatProvider for FakeChat {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, AiError> {
        let content = if request.response_format == ResponseFormat::Json {
            SLIDES_JSON.to_string()
        } else if request.user_prompt.contains("Question:") {
            "It runs locally.".to_string()
        } else {
            "Open models keep getting smaller. #AI".to_string()
        };
        Ok(CompletionResponse {
            content,
            model: Some("fake".to_string()),
            input_tokens: None,
            output_tokens: None,
            latency_ms: 1,
        })
    }

    fn model(&self) -> &str {
        "fake"
    }
}

pub struct FakeStt;

#[async_trait]
impl SpeechToText for FakeStt {
    async fn transcribe(&self, audio: AudioInput) -> Result<String, AiError> {
        Ok(String::from_utf8_lossy(&audio.bytes).into_owned())
    }
}

pub struct FakeTts;

#[async_trait]
impl TextToSpeech for FakeTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AiError> {
        Ok(format!("mp3:{text}").into_bytes())
    }
}

pub fn fake_ai() -> AiServices {
    AiServices {
        chat: Arc::new(FakeChat),
        stt: Arc::new(FakeStt),
        tts: Arc::new(FakeTts),
    }
}

/// State with fake AI services and no proxies configured.
pub fn test_state() -> Arc<AppState> {
    let proxy = ProxyClient::new(ProxyConfig::default()).unwrap();
    AppState::new(RunnerConfig::default(), Some(fake_ai()), proxy)
}

/// State with no AI services and no proxies configured.
pub fn bare_state() -> Arc<AppState> {
    let proxy = ProxyClient::new(ProxyConfig::default()).unwrap();
    AppState::new(RunnerConfig::default(), None, proxy)
}
