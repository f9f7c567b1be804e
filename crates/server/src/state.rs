// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use newsdeck_core::ai::{AiConfig, AiError, ChatProvider, OpenAiClient, SpeechToText, TextToSpeech};
use newsdeck_core::{CarouselGenerator, VoicePipeline};

use crate::error::{ApiError, ApiResult};
use crate::jobs::{JobRunner, RunnerConfig};
use crate::proxy::ProxyClient;

/// Service name reported when no AI credentials are configured.
pub const AI_SERVICE: &str = "ai";

/// The AI backends the carousel generator and voice pipeline run on.
#[derive(Clone)]
pub struct AiServices {
    pub chat: Arc<dyn ChatProvider>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
}

impl AiServices {
    /// All three services backed by one OpenAI-compatible client.
    pub fn openai(config: AiConfig) -> Result<Self, AiError> {
        let client = Arc::new(OpenAiClient::new(config)?);
        Ok(Self {
            chat: client.clone(),
            stt: client.clone(),
            tts: client,
        })
    }
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Job registry and worker pool for carousel generation.
    pub jobs: Arc<JobRunner>,
    carousel: Option<Arc<CarouselGenerator>>,
    voice: Option<VoicePipeline>,
    /// Credential-injecting proxies for news, TTS and export.
    pub proxy: ProxyClient,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    ///
    /// With `ai` absent the carousel and voice routes answer 503.
    pub fn new(runner: RunnerConfig, ai: Option<AiServices>, proxy: ProxyClient) -> Arc<Self> {
        let carousel = ai
            .as_ref()
            .map(|ai| Arc::new(CarouselGenerator::new(Arc::clone(&ai.chat))));
        let voice = ai.map(|ai| VoicePipeline::new(ai.stt, ai.chat, ai.tts));
        Arc::new(Self {
            start_time: Instant::now(),
            jobs: Arc::new(JobRunner::new(runner)),
            carousel,
            voice,
            proxy,
        })
    }

    pub fn carousel(&self) -> ApiResult<Arc<CarouselGenerator>> {
        self.carousel.clone().ok_or(ApiError::NotConfigured(AI_SERVICE))
    }

    pub fn voice(&self) -> ApiResult<&VoicePipeline> {
        self.voice.as_ref().ok_or(ApiError::NotConfigured(AI_SERVICE))
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
