//! Per-attempt decision logic.
//!
//! Each invocation of a task yields an [`Attempt`]; [`decide`] turns it into
//! the next [`Step`] of the run loop given the task's resolved behavior and
//! how many times it has already been retried.

use crate::core::behavior::ResolvedBehavior;
use crate::core::task::TaskError;

use super::error::JobFailure;

/// Outcome of a single task invocation.
#[derive(Debug)]
pub(crate) enum Attempt {
    /// The task returned `Ok(true)`.
    Succeeded,
    /// The task returned `Ok(false)`.
    Recoverable,
    /// The task returned an error.
    Errored(TaskError),
}

/// What the run loop does next.
#[derive(Debug)]
pub(crate) enum Step {
    /// Count the task as processed and move to the next one.
    Advance,
    /// Run the same task again; `attempt` is the 1-based retry number.
    Retry { attempt: u32 },
    /// Count the task as skipped and move to the next one.
    Skip,
    /// Stop the job.
    Abort(JobFailure),
}

/// Decide the next step for the task at `task_index` (1-based).
pub(crate) fn decide(
    attempt: Attempt,
    retries: u32,
    behavior: &ResolvedBehavior,
    task_index: usize,
) -> Step {
    match attempt {
        Attempt::Succeeded => Step::Advance,
        Attempt::Errored(source) if !behavior.do_not_break_on_error => {
            Step::Abort(JobFailure::Task { task_index, source })
        }
        Attempt::Recoverable | Attempt::Errored(_) => {
            if behavior.should_retry(retries) {
                Step::Retry {
                    attempt: retries + 1,
                }
            } else if behavior.skip_item_on_fail {
                Step::Skip
            } else {
                Step::Abort(JobFailure::MaxRetryReached {
                    task_index,
                    retries,
                })
            }
        }
    }
}
