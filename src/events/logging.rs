use async_trait::async_trait;
use tracing::{error, info, warn};

use super::{Event, EventHandler};

/// Event handler that writes every lifecycle event as a log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl LoggingHandler {
    /// Render an event as a single human-readable line.
    pub fn describe(event: &Event) -> String {
        match event {
            Event::JobStarted { job, .. } => format!("Job '{}' has started", job),
            Event::JobCompleted { job, result, .. } => format!(
                "Job '{}' has completed: {} processed, {} skipped, {} retried{}",
                job,
                result.processed_count,
                result.skipped_count,
                result.retry_count,
                if result.terminated { " (terminated)" } else { "" }
            ),
            Event::JobFailed { job, error, .. } => {
                format!("Job '{}' has failed: {}", job, error)
            }
            Event::JobTerminated {
                job, task_index, ..
            } => format!("Job '{}' was terminated before task #{}", job, task_index),
            Event::TaskStarted {
                job, task_index, ..
            } => format!("Job '{}' task #{} has started", job, task_index),
            Event::TaskCompleted {
                job,
                task_index,
                duration,
                ..
            } => format!(
                "Job '{}' task #{} has completed in {:?}",
                job, task_index, duration
            ),
            Event::TaskRetrying {
                job,
                task_index,
                attempt,
                ..
            } => format!("Job '{}' task #{} retry #{}", job, task_index, attempt),
            Event::TaskSkipping {
                job, task_index, ..
            } => format!("Job '{}' task #{} skipped", job, task_index),
            Event::TaskFailed {
                job,
                task_index,
                error,
                ..
            } => format!("Job '{}' task #{} has failed: {}", job, task_index, error),
        }
    }
}

#[async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &Event) {
        let line = Self::describe(event);
        match event {
            Event::JobFailed { .. } | Event::TaskFailed { .. } => error!("{}", line),
            Event::TaskRetrying { .. } | Event::TaskSkipping { .. } | Event::JobTerminated { .. } => {
                warn!("{}", line)
            }
            _ => info!("{}", line),
        }
    }
}
