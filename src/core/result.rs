//! Outcome summary of one job execution.

use serde::{Deserialize, Serialize};

/// Counters aggregated over one execution of a job.
///
/// `processed_count + skipped_count` never exceeds the job's task count, and
/// `failed_count` is 0 or 1 since a job stops at its first terminal failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Tasks that completed successfully.
    pub processed_count: u32,
    /// Tasks skipped after exhausting their retries.
    pub skipped_count: u32,
    /// Tasks that failed terminally.
    pub failed_count: u32,
    /// Retry attempts made across all tasks.
    pub retry_count: u32,
    /// Whether the run stopped because termination was requested.
    pub terminated: bool,
}

impl JobResult {
    /// Check whether the run finished without a terminal failure.
    pub fn is_success(&self) -> bool {
        self.failed_count == 0
    }
}
