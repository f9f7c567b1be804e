// crates/server/src/jobs/types.rs
//! Types for the background job system.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque job identifier (UUID v4 string).
pub type JobId = String;

/// Error text recorded on a job that was cancelled.
pub const CANCELLED: &str = "cancelled";

/// Error text recorded on a job whose work panicked.
pub const PANICKED: &str = "job panicked";

/// Lifecycle of a job. Only moves forward:
/// `Queued → Running → (Completed | Failed)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether `self → next` is a legal single step.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

/// Point-in-time copy of a job record, as returned by status reads and
/// sent over SSE.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct JobProgress {
    pub job_id: JobId,
    pub job_type: String,
    pub status: JobStatus,
    pub percent: u8,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job already started: {0}")]
    AlreadyStarted(JobId),

    #[error("Job was cancelled before it started: {0}")]
    Cancelled(JobId),
}
