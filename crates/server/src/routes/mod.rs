//! API route handlers for the newsdeck server.

pub mod audio;
pub mod carousel;
pub mod export;
pub mod health;
pub mod jobs;
pub mod news;
pub mod tts;
pub mod voice;

use std::sync::Arc;

use axum::extract::FromRequest;
use axum::Router;

use crate::error::ApiError;
use crate::state::AppState;

/// JSON body extractor whose rejections become `400` API errors.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET /api/health - Health check
/// - POST /api/carousel - Start carousel generation (202)
/// - GET /api/carousel/{job_id} - Poll carousel progress
/// - GET /api/jobs - List active jobs
/// - GET /api/jobs/stream - SSE stream of all job progress
/// - GET /api/jobs/{job_id}/stream - SSE stream for one job
/// - DELETE /api/jobs/{job_id} - Cancel a job
/// - POST /api/audio-summary - Narrate an article (audio/mpeg)
/// - POST /api/voice-chat - Spoken question in, spoken answer out
/// - GET /api/news - News search proxy
/// - POST /api/tts - Text-to-speech proxy
/// - POST /api/export - Spreadsheet export proxy
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", carousel::router())
        .nest("/api", jobs::router())
        .nest("/api", audio::router())
        .nest("/api", voice::router())
        .nest("/api", news::router())
        .nest("/api", tts::router())
        .nest("/api", export::router())
        .with_state(state)
}
