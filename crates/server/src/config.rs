// crates/server/src/config.rs
//! Command-line and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use newsdeck_core::ai::{AiConfig, Secret};

use crate::jobs::RunnerConfig;
use crate::proxy::{ProxyConfig, Upstream};

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47900;

#[derive(Debug, Clone, Parser)]
#[command(name = "newsdeck", version, about = "Backend for the AI news swipe app")]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "NEWSDECK_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to bind. Falls back to `PORT`, then the built-in default.
    #[arg(long, env = "NEWSDECK_PORT")]
    pub port: Option<u16>,

    /// Pre-built frontend to serve for non-API paths.
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,

    #[arg(long, env = "MAX_CONCURRENT_JOBS", default_value_t = 4)]
    pub max_concurrent_jobs: usize,

    #[arg(long, env = "JOB_TIMEOUT_SECS", default_value_t = 300)]
    pub job_timeout_secs: u64,

    /// How long finished jobs stay readable.
    #[arg(long, env = "JOB_RETENTION_SECS", default_value_t = 3600)]
    pub job_retention_secs: u64,

    /// Timeout for every outbound HTTP call.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 60)]
    pub upstream_timeout_secs: u64,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<Secret>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    #[arg(long, env = "CHAT_MODEL", default_value = "gpt-4o-mini")]
    pub chat_model: String,

    #[arg(long, env = "STT_MODEL", default_value = "whisper-1")]
    pub stt_model: String,

    #[arg(long, env = "TTS_MODEL", default_value = "tts-1")]
    pub tts_model: String,

    #[arg(long, env = "TTS_VOICE", default_value = "alloy")]
    pub tts_voice: String,

    #[arg(long, env = "NEWS_API_KEY", hide_env_values = true)]
    pub news_api_key: Option<Secret>,

    #[arg(long, env = "NEWS_API_URL", default_value = "https://newsapi.org/v2/everything")]
    pub news_api_url: String,

    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    pub elevenlabs_api_key: Option<Secret>,

    #[arg(long, env = "ELEVENLABS_URL", default_value = "https://api.elevenlabs.io/v1/text-to-speech")]
    pub elevenlabs_url: String,

    #[arg(long, env = "ELEVENLABS_VOICE_ID", default_value = "21m00Tcm4TlvDq8ikWAM")]
    pub elevenlabs_voice_id: String,

    /// Spreadsheet export webhook. Export is disabled when unset.
    #[arg(long, env = "SHEET_EXPORT_URL")]
    pub sheet_export_url: Option<String>,

    #[arg(long, env = "SHEET_EXPORT_TOKEN", hide_env_values = true)]
    pub sheet_export_token: Option<Secret>,
}

impl ServerConfig {
    pub fn port(&self) -> u16 {
        self.port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port())
    }

    pub fn job_retention(&self) -> Duration {
        Duration::from_secs(self.job_retention_secs)
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            max_concurrent_jobs: self.max_concurrent_jobs,
            job_timeout: Duration::from_secs(self.job_timeout_secs),
        }
    }

    /// `None` when no OpenAI key is set; AI routes then answer 503.
    pub fn ai_config(&self) -> Option<AiConfig> {
        let api_key = self.openai_api_key.clone().filter(|k| !k.is_empty())?;
        Some(AiConfig {
            api_key,
            base_url: self.openai_base_url.clone(),
            chat_model: self.chat_model.clone(),
            stt_model: self.stt_model.clone(),
            tts_model: self.tts_model.clone(),
            tts_voice: self.tts_voice.clone(),
            timeout_secs: self.upstream_timeout_secs,
        })
    }

    pub fn proxy_config(&self) -> ProxyConfig {
        let export = match self.sheet_export_url.as_deref().filter(|u| !u.trim().is_empty()) {
            Some(url) => Upstream::new(url, self.sheet_export_token.clone()),
            None => Upstream::disabled(),
        };
        ProxyConfig {
            news: Upstream::new(&self.news_api_url, self.news_api_key.clone()),
            tts: Upstream::new(&self.elevenlabs_url, self.elevenlabs_api_key.clone()),
            tts_voice_id: self.elevenlabs_voice_id.clone(),
            export,
            timeout: Duration::from_secs(self.upstream_timeout_secs),
            ..ProxyConfig::default()
        }
    }
}
