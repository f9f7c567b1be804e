// crates/server/src/jobs/state.rs
//! State of a single background job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use newsdeck_core::ProgressSink;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::types::{JobId, JobProgress, JobStatus, CANCELLED};

/// Mutable part of a job. Always replaced under one write lock, so readers
/// never see a half-applied transition.
#[derive(Debug)]
struct JobRecord {
    status: JobStatus,
    percent: u8,
    message: String,
    result: Option<serde_json::Value>,
    error: Option<String>,
    updated_at: DateTime<Utc>,
    finished_at: Option<Instant>,
}

/// State for one job: the record plus its cancellation token and the
/// channel progress updates are published on.
pub struct JobState {
    id: JobId,
    job_type: String,
    created_at: DateTime<Utc>,
    record: RwLock<JobRecord>,
    started: AtomicBool,
    cancel: CancellationToken,
    progress_tx: broadcast::Sender<JobProgress>,
}

impl JobState {
    /// Create a queued job that publishes its updates on `progress_tx`.
    pub fn new(id: JobId, job_type: String, progress_tx: broadcast::Sender<JobProgress>) -> Self {
        let now = Utc::now();
        Self {
            id,
            job_type,
            created_at: now,
            record: RwLock::new(JobRecord {
                status: JobStatus::Queued,
                percent: 0,
                message: "Queued".to_string(),
                result: None,
                error: None,
                updated_at: now,
                finished_at: None,
            }),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            progress_tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub fn status(&self) -> JobStatus {
        self.read().status
    }

    /// Claim the right to run this job. Only the first caller gets `true`.
    pub(crate) fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Ask the job to stop. Returns false if it already finished.
    ///
    /// A job no task has picked up yet is failed here, since nothing else
    /// is watching its token.
    pub fn cancel(&self) -> bool {
        if self.status().is_terminal() {
            return false;
        }
        self.cancel.cancel();
        if !self.started.load(Ordering::Acquire) {
            self.fail(CANCELLED);
        }
        true
    }

    /// Transition `Queued → Running`.
    pub fn set_running(&self) -> bool {
        self.update(|record| {
            if !record.status.can_advance_to(JobStatus::Running) {
                return false;
            }
            record.status = JobStatus::Running;
            record.message = "Starting".to_string();
            true
        })
    }

    /// Record step progress. A lower percent than the current one keeps the
    /// current value; updates outside `Running` are ignored.
    pub fn set_progress(&self, percent: u8, message: impl Into<String>) -> bool {
        let message = message.into();
        self.update(|record| {
            if record.status != JobStatus::Running {
                return false;
            }
            record.percent = record.percent.max(percent.min(100));
            record.message = message;
            true
        })
    }

    /// Transition `Running → Completed` with the job's output.
    pub fn complete(&self, result: serde_json::Value) -> bool {
        self.update(|record| {
            if !record.status.can_advance_to(JobStatus::Completed) {
                return false;
            }
            record.status = JobStatus::Completed;
            record.percent = 100;
            record.message = "Completed".to_string();
            record.result = Some(result);
            record.finished_at = Some(Instant::now());
            true
        })
    }

    /// Transition to `Failed`. A job still queued passes through `Running`
    /// first so observers only ever see forward steps.
    pub fn fail(&self, error: impl Into<String>) -> bool {
        if self.status() == JobStatus::Queued {
            self.set_running();
        }
        let error = error.into();
        self.update(|record| {
            if !record.status.can_advance_to(JobStatus::Failed) {
                return false;
            }
            record.status = JobStatus::Failed;
            record.message = "Failed".to_string();
            record.error = Some(error);
            record.finished_at = Some(Instant::now());
            true
        })
    }

    /// Time since the job reached a terminal state.
    pub fn finished_for(&self) -> Option<Duration> {
        self.read().finished_at.map(|t| t.elapsed())
    }

    /// Subscribe to this job's updates (and every other job sharing the channel).
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgress> {
        self.progress_tx.subscribe()
    }

    /// Get a snapshot of the current job state.
    pub fn snapshot(&self) -> JobProgress {
        self.snapshot_of(&self.read())
    }

    fn snapshot_of(&self, record: &JobRecord) -> JobProgress {
        JobProgress {
            job_id: self.id.clone(),
            job_type: self.job_type.clone(),
            status: record.status,
            percent: record.percent,
            message: record.message.clone(),
            result: record.result.clone(),
            error: record.error.clone(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }

    /// Apply `f` under the write lock and broadcast the new snapshot if it
    /// reports a change.
    fn update(&self, f: impl FnOnce(&mut JobRecord) -> bool) -> bool {
        let progress = {
            let mut record = self.write();
            if !f(&mut record) {
                return false;
            }
            record.updated_at = Utc::now();
            self.snapshot_of(&record)
        };
        // Ignore send errors (no subscribers is fine).
        let _ = self.progress_tx.send(progress);
        true
    }

    fn read(&self) -> RwLockReadGuard<'_, JobRecord> {
        self.record.read().unwrap_or_else(|poisoned| {
            tracing::error!(job_id = %self.id, "RwLock poisoned reading job record");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, JobRecord> {
        self.record.write().unwrap_or_else(|poisoned| {
            tracing::error!(job_id = %self.id, "RwLock poisoned writing job record");
            poisoned.into_inner()
        })
    }
}

impl ProgressSink for JobState {
    fn report(&self, percent: u8, message: &str) {
        self.set_progress(percent, message);
    }
}
