// crates/server/src/routes/carousel.rs
//! Carousel generation routes.
//!
//! - POST /carousel           - Start a generation job (202)
//! - GET  /carousel/{job_id}  - Poll its progress and result

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use newsdeck_core::{Carousel, CarouselRequest, Slide};
use serde::Serialize;

use super::ApiJson;
use crate::error::{ApiError, ApiResult};
use crate::jobs::{JobProgress, JobStatus};
use crate::state::AppState;

/// Job type label for carousel generation.
pub const CAROUSEL_JOB: &str = "carousel";

/// Response for POST /api/carousel (202 Accepted).
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct StartCarouselResponse {
    pub job_id: String,
    pub status: JobStatus,
}

/// Response for GET /api/carousel/{job_id}.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct CarouselStatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub percent: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slides: Option<Vec<Slide>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CarouselStatusResponse {
    fn from_progress(progress: JobProgress) -> ApiResult<Self> {
        let carousel = match progress.result {
            Some(value) => Some(serde_json::from_value::<Carousel>(value).map_err(|e| {
                ApiError::Internal(format!("job {} has a malformed result: {e}", progress.job_id))
            })?),
            None => None,
        };
        let (slides, caption, preview) = match carousel {
            Some(c) => (Some(c.slides), c.caption, Some(c.preview)),
            None => (None, None, None),
        };
        Ok(Self {
            job_id: progress.job_id,
            status: progress.status,
            percent: progress.percent,
            message: progress.message,
            slides,
            caption,
            preview,
            error: progress.error,
        })
    }
}

/// POST /api/carousel - Validate the article and queue generation.
async fn start_carousel(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CarouselRequest>,
) -> ApiResult<(StatusCode, Json<StartCarouselResponse>)> {
    if let Some(field) = request.article().missing_field() {
        return Err(ApiError::BadRequest(format!("Missing required field: {field}")));
    }
    let generator = state.carousel()?;
    let preview_only = request.preview_only;

    let job_id = state.jobs.spawn(CAROUSEL_JOB, move |job| async move {
        let carousel = generator.generate(&request, &*job).await.map_err(|e| {
            tracing::warn!(job_id = %job.id(), error = %e, "carousel generation failed");
            e.client_message()
        })?;
        serde_json::to_value(carousel).map_err(|e| e.to_string())
    });
    tracing::info!(job_id = %job_id, preview_only, "carousel job queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(StartCarouselResponse {
            job_id,
            status: JobStatus::Queued,
        }),
    ))
}

/// GET /api/carousel/{job_id} - Current progress, plus the carousel once done.
async fn carousel_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<CarouselStatusResponse>> {
    let progress = state
        .jobs
        .get_job(&job_id)
        .filter(|p| p.job_type == CAROUSEL_JOB)
        .ok_or_else(|| ApiError::JobNotFound(job_id.clone()))?;
    Ok(Json(CarouselStatusResponse::from_progress(progress)?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/carousel", post(start_carousel))
        .route("/carousel/{job_id}", get(carousel_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bare_state, test_state};
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(state: Arc<AppState>) -> Router {
        router().with_state(state)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn wait_for_terminal(state: &Arc<AppState>, job_id: &str) -> JobProgress {
        for _ in 0..200 {
            let progress = state.jobs.get_job(job_id).unwrap();
            if progress.status.is_terminal() {
                return progress;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {job_id} did not finish");
    }

    #[tokio::test]
    async fn test_start_returns_202_with_job_id() {
        let state = test_state();
        let (status, json) = send(
            app(state.clone()),
            post_json("/carousel", serde_json::json!({ "title": "T", "summary": "S" })),
        )
        .await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(json["status"], "queued");
        let job_id = json["job_id"].as_str().unwrap();
        assert!(state.jobs.get_job(job_id).is_some());
    }

    #[tokio::test]
    async fn test_full_run_completes_with_caption() {
        let state = test_state();
        let (_, json) = send(
            app(state.clone()),
            post_json("/carousel", serde_json::json!({ "title": "T", "summary": "S" })),
        )
        .await;
        let job_id = json["job_id"].as_str().unwrap().to_string();
        wait_for_terminal(&state, &job_id).await;

        let (status, json) = send(app(state), get(&format!("/carousel/{job_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "completed");
        assert_eq!(json["percent"], 100);
        assert_eq!(json["slides"].as_array().unwrap().len(), 4);
        assert_eq!(json["slides"][0]["index"], 1);
        assert!(json["caption"].as_str().unwrap().contains("#AI"));
        assert_eq!(json["preview"], false);
    }

    #[tokio::test]
    async fn test_preview_run_caps_slides_and_skips_caption() {
        let state = test_state();
        let (_, json) = send(
            app(state.clone()),
            post_json(
                "/carousel",
                serde_json::json!({ "title": "T", "summary": "S", "preview_only": true }),
            ),
        )
        .await;
        let job_id = json["job_id"].as_str().unwrap().to_string();
        wait_for_terminal(&state, &job_id).await;

        let (_, json) = send(app(state), get(&format!("/carousel/{job_id}"))).await;
        assert_eq!(json["slides"].as_array().unwrap().len(), 3);
        assert!(json.get("caption").is_none());
        assert_eq!(json["preview"], true);
    }

    #[tokio::test]
    async fn test_missing_summary_is_400() {
        let (status, json) = send(
            app(test_state()),
            post_json("/carousel", serde_json::json!({ "title": "T", "summary": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["details"].as_str().unwrap().contains("summary"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let request = Request::builder()
            .method("POST")
            .uri("/carousel")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, json) = send(app(test_state()), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Bad request");
    }

    #[tokio::test]
    async fn test_unconfigured_ai_is_503() {
        let (status, _) = send(
            app(bare_state()),
            post_json("/carousel", serde_json::json!({ "title": "T", "summary": "S" })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let (status, json) = send(app(test_state()), get("/carousel/no-such-job")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Job not found");
    }

    #[tokio::test]
    async fn test_other_job_types_are_not_visible() {
        let state = test_state();
        let job_id = state.jobs.create_job("export");
        let (status, _) = send(app(state), get(&format!("/carousel/{job_id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_fresh_job_reads_as_queued() {
        let state = test_state();
        let job_id = state.jobs.create_job(CAROUSEL_JOB);
        let (status, json) = send(app(state), get(&format!("/carousel/{job_id}"))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "queued");
        assert_eq!(json["percent"], 0);
        assert!(json.get("slides").is_none());
    }
}
