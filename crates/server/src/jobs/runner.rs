// crates/server/src/jobs/runner.rs
//! Job registry and bounded worker pool.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;

use super::state::JobState;
use super::types::{JobError, JobId, JobProgress, CANCELLED, PANICKED};

/// Limits applied to every job.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Jobs allowed to run at once; the rest wait `queued`.
    pub max_concurrent_jobs: usize,
    /// Wall-clock limit for one job once it is running.
    pub job_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            job_timeout: Duration::from_secs(300),
        }
    }
}

/// Central registry of background jobs.
///
/// Thread-safe; share it behind an `Arc`. `create_job` registers a queued
/// job, `start` runs work for it on a spawned task, and `get_job` returns
/// the current snapshot for status polling.
pub struct JobRunner {
    jobs: RwLock<HashMap<JobId, Arc<JobState>>>,
    permits: Arc<Semaphore>,
    job_timeout: Duration,
    global_tx: broadcast::Sender<JobProgress>,
}

impl JobRunner {
    pub fn new(config: RunnerConfig) -> Self {
        let (global_tx, _) = broadcast::channel(256);
        Self {
            jobs: RwLock::new(HashMap::new()),
            permits: Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1))),
            job_timeout: config.job_timeout,
            global_tx,
        }
    }

    /// Register a new queued job and return its id. The job is visible to
    /// `get_job` as soon as this returns.
    pub fn create_job(&self, job_type: impl Into<String>) -> JobId {
        let id = uuid::Uuid::new_v4().to_string();
        let state = Arc::new(JobState::new(id.clone(), job_type.into(), self.global_tx.clone()));
        self.write().insert(id.clone(), state);
        id
    }

    /// Run `f` for a previously created job on its own task.
    ///
    /// The task waits for a pool permit while the job stays `queued`, then
    /// marks it `running`. `Ok(value)` completes the job with `value` as its
    /// result; `Err(message)` fails it. Timeout and cancellation also fail it.
    pub fn start<F, Fut>(&self, id: &str, f: F) -> Result<(), JobError>
    where
        F: FnOnce(Arc<JobState>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<serde_json::Value, String>> + Send + 'static,
    {
        let state = self.get_state(id).ok_or_else(|| JobError::NotFound(id.to_string()))?;
        if state.is_cancelled() {
            return Err(JobError::Cancelled(id.to_string()));
        }
        if !state.mark_started() {
            return Err(JobError::AlreadyStarted(id.to_string()));
        }

        let permits = Arc::clone(&self.permits);
        let job_timeout = self.job_timeout;
        tokio::spawn(async move {
            let cancel = state.cancellation_token();

            let _permit = tokio::select! {
                permit = permits.acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        state.fail("job pool closed");
                        return;
                    }
                },
                _ = cancel.cancelled() => {
                    tracing::info!(job_id = %state.id(), "job cancelled while queued");
                    state.fail(CANCELLED);
                    return;
                }
            };

            if !state.set_running() {
                return;
            }
            tracing::info!(job_id = %state.id(), job_type = %state.job_type(), "job started");

            // Own task, so a panic in the work surfaces as a JoinError here.
            let mut work = tokio::spawn(f(Arc::clone(&state)));
            let outcome = tokio::select! {
                joined = tokio::time::timeout(job_timeout, &mut work) => match joined {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) if e.is_panic() => {
                        tracing::error!(job_id = %state.id(), "job panicked");
                        Err(PANICKED.to_string())
                    }
                    Ok(Err(_)) => Err(CANCELLED.to_string()),
                    Err(_) => {
                        work.abort();
                        Err(format!("timed out after {} seconds", job_timeout.as_secs()))
                    }
                },
                _ = cancel.cancelled() => {
                    work.abort();
                    Err(CANCELLED.to_string())
                }
            };

            match outcome {
                Ok(result) => {
                    state.complete(result);
                    tracing::info!(job_id = %state.id(), "job completed");
                }
                Err(error) => {
                    tracing::warn!(job_id = %state.id(), error = %error, "job failed");
                    state.fail(error);
                }
            }
        });

        Ok(())
    }

    /// `create_job` followed by `start`.
    pub fn spawn<F, Fut>(&self, job_type: impl Into<String>, f: F) -> JobId
    where
        F: FnOnce(Arc<JobState>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<serde_json::Value, String>> + Send + 'static,
    {
        let id = self.create_job(job_type);
        if let Err(e) = self.start(&id, f) {
            // Unreachable for a freshly created id, but never leave it queued forever.
            tracing::error!(job_id = %id, error = %e, "failed to start new job");
            if let Some(state) = self.get_state(&id) {
                state.fail(e.to_string());
            }
        }
        id
    }

    /// Subscribe to all job progress updates (for SSE streaming).
    pub fn subscribe(&self) -> broadcast::Receiver<JobProgress> {
        self.global_tx.subscribe()
    }

    /// Subscribe to one job. The receiver is created before the snapshot is
    /// taken, so no update between the two is lost.
    pub fn subscribe_job(&self, id: &str) -> Option<(JobProgress, broadcast::Receiver<JobProgress>)> {
        let state = self.get_state(id)?;
        let rx = state.subscribe();
        Some((state.snapshot(), rx))
    }

    /// Get current status of a specific job.
    pub fn get_job(&self, id: &str) -> Option<JobProgress> {
        self.read().get(id).map(|s| s.snapshot())
    }

    /// Get all active (non-terminal) jobs.
    pub fn active_jobs(&self) -> Vec<JobProgress> {
        self.read()
            .values()
            .map(|s| s.snapshot())
            .filter(|p| !p.status.is_terminal())
            .collect()
    }

    /// Cancel a job. `None` if the id is unknown, `Some(false)` if it had
    /// already finished.
    pub fn cancel(&self, id: &str) -> Option<bool> {
        let state = self.get_state(id)?;
        let cancelled = state.cancel();
        if cancelled {
            tracing::info!(job_id = %id, "job cancellation requested");
        }
        Some(cancelled)
    }

    /// Cancel every unfinished job. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        self.read().values().filter(|s| s.cancel()).count()
    }

    /// Drop finished jobs older than `max_age`. Returns how many were removed.
    pub fn prune_finished(&self, max_age: Duration) -> usize {
        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, s| s.finished_for().map_or(true, |age| age < max_age));
        before - jobs.len()
    }

    /// Spawn a background task that periodically prunes finished jobs.
    pub fn spawn_retention_sweep(self: &Arc<Self>, retention: Duration) -> JoinHandle<()> {
        let runner = Arc::clone(self);
        let period = retention.min(Duration::from_secs(60)).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let removed = runner.prune_finished(retention);
                if removed > 0 {
                    tracing::debug!(removed, "pruned finished jobs");
                }
            }
        })
    }

    /// Number of jobs currently tracked.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_state(&self, id: &str) -> Option<Arc<JobState>> {
        self.read().get(id).cloned()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Arc<JobState>>> {
        self.jobs.read().unwrap_or_else(|poisoned| {
            tracing::error!("RwLock poisoned reading jobs map");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Arc<JobState>>> {
        self.jobs.write().unwrap_or_else(|poisoned| {
            tracing::error!("RwLock poisoned writing jobs map");
            poisoned.into_inner()
        })
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}
