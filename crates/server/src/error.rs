// crates/server/src/error.rs
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use newsdeck_core::{CarouselError, VoiceError};
use serde::Serialize;
use thiserror::Error;

use crate::jobs::JobError;
use crate::proxy::ProxyError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Service not configured: {0}")]
    NotConfigured(&'static str),

    #[error("Upstream unreachable: {upstream}: {message}")]
    UpstreamUnavailable { upstream: &'static str, message: String },

    #[error("Voice pipeline error: {0}")]
    Voice(#[from] VoiceError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => ApiError::JobNotFound(id),
            JobError::AlreadyStarted(id) => ApiError::Conflict(format!("Job {id} already started")),
            JobError::Cancelled(id) => ApiError::Conflict(format!("Job {id} was cancelled")),
        }
    }
}

impl From<ProxyError> for ApiError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::NotConfigured(service) => ApiError::NotConfigured(service.as_str()),
            ProxyError::Unreachable { upstream, message } => ApiError::UpstreamUnavailable {
                upstream: upstream.as_str(),
                message,
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<CarouselError> for ApiError {
    fn from(err: CarouselError) -> Self {
        match err {
            CarouselError::MissingField(field) => {
                ApiError::BadRequest(format!("Missing required field: {field}"))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::JobNotFound(id) => {
                tracing::warn!(job_id = %id, "Job not found");
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::with_details("Job not found", format!("Job ID: {}", id)),
                )
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Bad request", msg.clone()),
                )
            }
            ApiError::Conflict(msg) => {
                tracing::warn!(message = %msg, "Conflict");
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::with_details("Conflict", msg.clone()),
                )
            }
            ApiError::NotConfigured(service) => {
                tracing::warn!(service, "Request for unconfigured service");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::with_details("Service not configured", *service),
                )
            }
            ApiError::UpstreamUnavailable { upstream, message } => {
                tracing::error!(upstream, error = %message, "Upstream unreachable");
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse::new("Upstream service unavailable"),
                )
            }
            ApiError::Voice(err) => match err.stage() {
                None => {
                    tracing::warn!(error = %err, "Rejected voice request");
                    (
                        StatusCode::BAD_REQUEST,
                        ErrorResponse::with_details("Bad request", err.to_string()),
                    )
                }
                Some(stage) => {
                    // Upstream bodies stay in the log.
                    tracing::error!(stage = stage.as_str(), error = %err, "Voice pipeline stage failed");
                    (
                        StatusCode::BAD_GATEWAY,
                        ErrorResponse::with_details("Voice pipeline failed", format!("{} failed", stage.as_str())),
                    )
                }
            },
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal server error"),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
