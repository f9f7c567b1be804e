// crates/server/src/routes/jobs.rs
//! API routes for background job management.
//!
//! - GET    /jobs                  - List all active background jobs
//! - GET    /jobs/stream           - SSE stream of job progress updates
//! - GET    /jobs/{job_id}/stream  - SSE stream for one job, ends when it finishes
//! - DELETE /jobs/{job_id}         - Cancel a job

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::error::{ApiError, ApiResult};
use crate::jobs::JobProgress;
use crate::state::AppState;

/// Response for DELETE /api/jobs/{job_id}.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct CancelResponse {
    pub job_id: String,
    /// `false` when the job had already finished.
    pub cancelled: bool,
}

fn progress_event(progress: &JobProgress) -> Event {
    let json = serde_json::to_string(progress).unwrap_or_default();
    Event::default().event(progress.status.as_str()).data(json)
}

/// GET /api/jobs - List all active jobs.
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobProgress>> {
    Json(state.jobs.active_jobs())
}

/// GET /api/jobs/stream - SSE stream of all job progress updates.
async fn stream_jobs(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.jobs.subscribe();

    let stream = async_stream::stream! {
        let mut rx = rx;
        loop {
            match rx.recv().await {
                Ok(progress) => yield Ok(progress_event(&progress)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "job stream subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/jobs/{job_id}/stream - Current snapshot, then every update for
/// this job until it completes or fails.
async fn stream_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>> {
    let (snapshot, rx) = state
        .jobs
        .subscribe_job(&job_id)
        .ok_or_else(|| ApiError::JobNotFound(job_id.clone()))?;

    let stream = async_stream::stream! {
        let mut rx = rx;
        let done = snapshot.status.is_terminal();
        yield Ok(progress_event(&snapshot));
        if !done {
            loop {
                let progress = match rx.recv().await {
                    Ok(progress) if progress.job_id == job_id => progress,
                    Ok(_) => continue,
                    // Missed updates; fall back to a fresh read.
                    Err(RecvError::Lagged(_)) => match state.jobs.get_job(&job_id) {
                        Some(progress) => progress,
                        None => break,
                    },
                    Err(RecvError::Closed) => break,
                };
                let done = progress.status.is_terminal();
                yield Ok(progress_event(&progress));
                if done {
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// DELETE /api/jobs/{job_id} - Request cancellation.
async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<CancelResponse>> {
    let cancelled = state
        .jobs
        .cancel(&job_id)
        .ok_or_else(|| ApiError::JobNotFound(job_id.clone()))?;
    Ok(Json(CancelResponse { job_id, cancelled }))
}

/// Build the jobs router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/stream", get(stream_jobs))
        .route("/jobs/{job_id}", axum::routing::delete(cancel_job))
        .route("/jobs/{job_id}/stream", get(stream_job))
}
