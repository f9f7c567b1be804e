// crates/server/src/lib.rs
//! Newsdeck server library.
//!
//! Axum HTTP server for the AI news swipe app: carousel generation jobs with
//! progress polling, the voice pipeline, and credential-injecting proxies for
//! news search, text-to-speech and spreadsheet export.

pub mod config;
pub mod error;
pub mod jobs;
pub mod proxy;
pub mod routes;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::ServerConfig;
pub use error::*;
pub use routes::api_routes;
pub use state::{AiServices, AppState};

use std::path::Path;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Largest accepted request body. Voice questions arrive as base64 audio.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes under `/api`
/// - CORS allowing any origin, method and header
/// - Request tracing
/// - Optional static frontend for every non-API path
pub fn create_app(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = api_routes(state);
    if let Some(dir) = static_dir {
        tracing::info!(dir = %dir.display(), "serving static files");
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
