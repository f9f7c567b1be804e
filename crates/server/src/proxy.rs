// crates/server/src/proxy.rs
//! Credential-injecting proxies for third-party APIs.
//!
//! Each proxy calls one fixed upstream with a server-held key and relays the
//! upstream's status, content type and body unchanged. Transport failures are
//! logged here and surface to clients only as a generic error.

use std::fmt;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use newsdeck_core::ai::Secret;
use serde::Deserialize;
use thiserror::Error;

/// The third-party services reachable through the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    News,
    Tts,
    Export,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::News, Service::Tts, Service::Export];

    pub fn as_str(self) -> &'static str {
        match self {
            Service::News => "news",
            Service::Tts => "tts",
            Service::Export => "export",
        }
    }

    /// News and TTS are keyed APIs; the export webhook may be open.
    fn requires_credential(self) -> bool {
        match self {
            Service::News | Service::Tts => true,
            Service::Export => false,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest text the TTS proxy will forward.
pub const MAX_TTS_CHARS: usize = 5000;

const DEFAULT_PAGE_SIZE: u32 = 20;

/// One upstream endpoint and its credential.
#[derive(Debug, Clone)]
pub struct Upstream {
    pub url: Option<String>,
    pub credential: Option<Secret>,
}

impl Upstream {
    pub fn new(url: impl Into<String>, credential: Option<Secret>) -> Self {
        Self {
            url: Some(url.into()),
            credential: credential.filter(|c| !c.is_empty()),
        }
    }

    pub fn disabled() -> Self {
        Self { url: None, credential: None }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// News search (NewsAPI `everything` endpoint); key sent as `X-Api-Key`.
    pub news: Upstream,
    /// Text-to-speech (ElevenLabs); key sent as `xi-api-key`.
    pub tts: Upstream,
    pub tts_voice_id: String,
    pub tts_model_id: String,
    /// Spreadsheet export webhook; optional bearer token.
    pub export: Upstream,
    pub timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            news: Upstream::disabled(),
            tts: Upstream::disabled(),
            tts_voice_id: "21m00Tcm4TlvDq8ikWAM".into(),
            tts_model_id: "eleven_multilingual_v2".into(),
            export: Upstream::disabled(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Query parameters accepted by the news proxy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewsQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0} proxy is not configured")]
    NotConfigured(Service),

    #[error("{upstream} upstream unreachable: {message}")]
    Unreachable { upstream: Service, message: String },
}

/// Upstream reply relayed verbatim to the client.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        if let Some(content_type) = self.content_type {
            response.headers_mut().insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}

pub struct ProxyClient {
    http: reqwest::Client,
    config: ProxyConfig,
}

impl ProxyClient {
    pub fn new(config: ProxyConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn is_configured(&self, upstream: Service) -> bool {
        self.require(upstream).is_ok()
    }

    /// GET the news search upstream for `query` (already validated non-blank).
    pub async fn search_news(&self, query: &str, params: &NewsQuery) -> Result<UpstreamResponse, ProxyError> {
        let (url, key) = self.require(Service::News)?;
        let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);

        let mut request = self
            .http
            .get(url)
            .query(&[("q", query), ("sortBy", "publishedAt")])
            .query(&[("pageSize", page_size)]);
        if let Some(language) = params.language.as_deref().filter(|l| !l.is_empty()) {
            request = request.query(&[("language", language)]);
        }
        if let Some(key) = key {
            request = request.header("X-Api-Key", key.expose());
        }
        self.relay(Service::News, request).await
    }

    /// POST `text` to the TTS upstream for `voice_id` (or the default voice).
    pub async fn text_to_speech(&self, text: &str, voice_id: Option<&str>) -> Result<UpstreamResponse, ProxyError> {
        let (url, key) = self.require(Service::Tts)?;
        let voice_id = voice_id
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(self.config.tts_voice_id.as_str());

        let mut request = self
            .http
            .post(format!("{}/{}", url.trim_end_matches('/'), voice_id))
            .header(header::ACCEPT, "audio/mpeg")
            .json(&serde_json::json!({
                "text": text,
                "model_id": self.config.tts_model_id,
            }));
        if let Some(key) = key {
            request = request.header("xi-api-key", key.expose());
        }
        self.relay(Service::Tts, request).await
    }

    /// POST a JSON payload to the spreadsheet export upstream.
    pub async fn export(&self, payload: &serde_json::Value) -> Result<UpstreamResponse, ProxyError> {
        let (url, key) = self.require(Service::Export)?;
        let mut request = self.http.post(url).json(payload);
        if let Some(key) = key {
            request = request.bearer_auth(key.expose());
        }
        self.relay(Service::Export, request).await
    }

    fn require(&self, upstream: Service) -> Result<(&str, Option<&Secret>), ProxyError> {
        let target = match upstream {
            Service::News => &self.config.news,
            Service::Tts => &self.config.tts,
            Service::Export => &self.config.export,
        };
        let url = target.url.as_deref().ok_or(ProxyError::NotConfigured(upstream))?;
        if upstream.requires_credential() && target.credential.is_none() {
            return Err(ProxyError::NotConfigured(upstream));
        }
        Ok((url, target.credential.as_ref()))
    }

    async fn relay(
        &self,
        upstream: Service,
        request: reqwest::RequestBuilder,
    ) -> Result<UpstreamResponse, ProxyError> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(upstream = %upstream, error = %e, "proxy upstream unreachable");
            ProxyError::Unreachable {
                upstream,
                message: e.to_string(),
            }
        })?;

        let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| HeaderValue::from_bytes(v.as_bytes()).ok());
        let body = response.bytes().await.map_err(|e| {
            tracing::warn!(upstream = %upstream, error = %e, "proxy upstream body read failed");
            ProxyError::Unreachable {
                upstream,
                message: e.to_string(),
            }
        })?;

        if status.is_success() {
            tracing::debug!(upstream = %upstream, status = status.as_u16(), body_len = body.len(), "proxy relayed");
        } else {
            tracing::warn!(upstream = %upstream, status = status.as_u16(), "proxy upstream returned error status");
        }
        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header as header_is, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(config: ProxyConfig) -> ProxyClient {
        ProxyClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_news_injects_key_and_relays_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .and(query_param("q", "open models"))
            .and(query_param("pageSize", "5"))
            .and(header_is("x-api-key", "news-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "status": "ok", "articles": [] })),
            )
            .mount(&server)
            .await;

        let proxy = client(ProxyConfig {
            news: Upstream::new(format!("{}/v2/everything", server.uri()), Some(Secret::new("news-key"))),
            ..ProxyConfig::default()
        });
        let params = NewsQuery { page_size: Some(5), ..NewsQuery::default() };
        let resp = proxy.search_news("open models", &params).await.unwrap();

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.content_type.unwrap(), "application/json");
        let body: serde_json::Value = serde_json::from_slice(&resp.body).unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_upstream_error_status_is_relayed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rateLimited"))
            .mount(&server)
            .await;

        let proxy = client(ProxyConfig {
            news: Upstream::new(server.uri(), Some(Secret::new("k"))),
            ..ProxyConfig::default()
        });
        let resp = proxy.search_news("ai", &NewsQuery::default()).await.unwrap();
        assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(&resp.body[..], b"rateLimited");
    }

    #[tokio::test]
    async fn test_tts_uses_default_voice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-123"))
            .and(header_is("xi-api-key", "tts-key"))
            .and(body_partial_json(serde_json::json!({ "text": "Hello there" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(vec![0xff, 0xfb]),
            )
            .mount(&server)
            .await;

        let proxy = client(ProxyConfig {
            tts: Upstream::new(format!("{}/v1/text-to-speech", server.uri()), Some(Secret::new("tts-key"))),
            tts_voice_id: "voice-123".into(),
            ..ProxyConfig::default()
        });
        let resp = proxy.text_to_speech("Hello there", None).await.unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.content_type.unwrap(), "audio/mpeg");
        assert_eq!(&resp.body[..], &[0xff, 0xfb]);
    }

    #[tokio::test]
    async fn test_export_without_token_is_allowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/exec"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "ok": true })))
            .mount(&server)
            .await;

        let proxy = client(ProxyConfig {
            export: Upstream::new(format!("{}/exec", server.uri()), None),
            ..ProxyConfig::default()
        });
        let resp = proxy.export(&serde_json::json!({ "rows": [["a", "b"]] })).await.unwrap();
        assert_eq!(resp.status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_unconfigured_proxies() {
        let proxy = client(ProxyConfig {
            news: Upstream::new("http://localhost/news", None),
            ..ProxyConfig::default()
        });
        assert!(!proxy.is_configured(Service::News));
        assert!(!proxy.is_configured(Service::Tts));
        assert!(!proxy.is_configured(Service::Export));
        assert!(matches!(
            proxy.search_news("ai", &NewsQuery::default()).await,
            Err(ProxyError::NotConfigured(Service::News))
        ));
    }

    #[tokio::test]
    async fn test_each_service_reads_its_own_upstream() {
        let proxy = client(ProxyConfig {
            tts: Upstream::new("http://localhost/tts", Some(Secret::new("k"))),
            ..ProxyConfig::default()
        });
        assert!(!proxy.is_configured(Service::News));
        assert!(proxy.is_configured(Service::Tts));
        assert!(!proxy.is_configured(Service::Export));

        let proxy = client(ProxyConfig {
            export: Upstream::new("http://localhost/exec", None),
            ..ProxyConfig::default()
        });
        let configured: Vec<&str> = Service::ALL
            .into_iter()
            .filter(|s| proxy.is_configured(*s))
            .map(Service::as_str)
            .collect();
        assert_eq!(configured, vec!["export"]);
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        let proxy = client(ProxyConfig {
            export: Upstream::new("http://127.0.0.1:1/exec", None),
            ..ProxyConfig::default()
        });
        let err = proxy.export(&serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ProxyError::Unreachable { upstream: Service::Export, .. }));
    }
}
