//! Engine error types.

use thiserror::Error;

use crate::core::task::TaskError;
use crate::core::types::JobName;
use crate::registry::RegistryError;

/// Errors returned to callers of the engine for misuse or bad preconditions.
///
/// Failures inside a running job never surface here; see [`JobFailure`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Registration collision or unknown job name.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The job already has a run in flight.
    #[error("job is busy: {0}")]
    Busy(JobName),

    /// Termination was requested for a job that is not running.
    #[error("job is not running: {0}")]
    NotRunning(JobName),
}

/// A terminal failure that aborts a job run.
///
/// Captured by the engine and reported through `task_failed` and `job_failed`
/// events and the run's `failed_count`.
#[derive(Debug, Error)]
pub enum JobFailure {
    /// The task kept failing after all allowed retries and may not be skipped.
    #[error("task #{task_index} reached the maximum of {retries} retries")]
    MaxRetryReached { task_index: usize, retries: u32 },

    /// The task raised an error that was not downgraded.
    #[error("task #{task_index} raised an error: {source}")]
    Task {
        task_index: usize,
        #[source]
        source: TaskError,
    },
}

impl JobFailure {
    /// 1-based index of the task that failed.
    pub fn task_index(&self) -> usize {
        match self {
            JobFailure::MaxRetryReached { task_index, .. } | JobFailure::Task { task_index, .. } => {
                *task_index
            }
        }
    }
}
