// crates/server/src/jobs/mod.rs
//! Background job system for long-running generation tasks.
//!
//! Provides:
//! - `JobRunner` - registry + bounded pool for spawning and tracking jobs
//! - `JobState` - lock-guarded progress record per job
//! - `JobProgress` - snapshot returned by status reads and SSE

pub mod runner;
pub mod state;
pub mod types;

pub use runner::{JobRunner, RunnerConfig};
pub use state::JobState;
pub use types::{JobError, JobId, JobProgress, JobStatus, CANCELLED, PANICKED};
