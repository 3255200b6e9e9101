//! Lifecycle events and event handling.
//!
//! The engine only publishes; anything implementing [`EventPublisher`] can
//! receive the stream. [`EventBus`] is the bundled implementation that fans
//! each event out to registered [`EventHandler`]s.
//!
//! All task indices carried by events are 1-based.

mod logging;

pub use logging::LoggingHandler;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::result::JobResult;
use crate::core::types::JobName;

/// Lifecycle events emitted during job execution.
#[derive(Debug, Clone)]
pub enum Event {
    /// A job run has started.
    JobStarted { job: JobName, timestamp: Instant },

    /// A job run finished without a terminal failure (possibly terminated early).
    JobCompleted {
        job: JobName,
        result: JobResult,
        timestamp: Instant,
    },

    /// A job run was aborted by a terminal failure.
    JobFailed {
        job: JobName,
        error: String,
        timestamp: Instant,
    },

    /// A job run observed a termination request before running `task_index`.
    JobTerminated {
        job: JobName,
        task_index: usize,
        timestamp: Instant,
    },

    /// A task invocation is starting (after its delay).
    TaskStarted {
        job: JobName,
        task_index: usize,
        timestamp: Instant,
    },

    /// A task invocation succeeded.
    TaskCompleted {
        job: JobName,
        task_index: usize,
        duration: Duration,
        timestamp: Instant,
    },

    /// A task failed recoverably and will be attempted again.
    TaskRetrying {
        job: JobName,
        task_index: usize,
        /// Retry number for this task, starting at 1.
        attempt: u32,
        timestamp: Instant,
    },

    /// A task exhausted its retries and is being skipped.
    TaskSkipping {
        job: JobName,
        task_index: usize,
        timestamp: Instant,
    },

    /// A task failed terminally; the job stops.
    TaskFailed {
        job: JobName,
        task_index: usize,
        error: String,
        timestamp: Instant,
    },
}

impl Event {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::JobStarted { timestamp, .. }
            | Event::JobCompleted { timestamp, .. }
            | Event::JobFailed { timestamp, .. }
            | Event::JobTerminated { timestamp, .. }
            | Event::TaskStarted { timestamp, .. }
            | Event::TaskCompleted { timestamp, .. }
            | Event::TaskRetrying { timestamp, .. }
            | Event::TaskSkipping { timestamp, .. }
            | Event::TaskFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job the event belongs to.
    pub fn job(&self) -> &JobName {
        match self {
            Event::JobStarted { job, .. }
            | Event::JobCompleted { job, .. }
            | Event::JobFailed { job, .. }
            | Event::JobTerminated { job, .. }
            | Event::TaskStarted { job, .. }
            | Event::TaskCompleted { job, .. }
            | Event::TaskRetrying { job, .. }
            | Event::TaskSkipping { job, .. }
            | Event::TaskFailed { job, .. } => job,
        }
    }

    /// Get the 1-based task index, for task-scoped events and `JobTerminated`.
    pub fn task_index(&self) -> Option<usize> {
        match self {
            Event::JobTerminated { task_index, .. }
            | Event::TaskStarted { task_index, .. }
            | Event::TaskCompleted { task_index, .. }
            | Event::TaskRetrying { task_index, .. }
            | Event::TaskSkipping { task_index, .. }
            | Event::TaskFailed { task_index, .. } => Some(*task_index),
            _ => None,
        }
    }

    /// Stable snake_case name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::JobStarted { .. } => "job_started",
            Event::JobCompleted { .. } => "job_completed",
            Event::JobFailed { .. } => "job_failed",
            Event::JobTerminated { .. } => "job_terminated",
            Event::TaskStarted { .. } => "task_started",
            Event::TaskCompleted { .. } => "task_completed",
            Event::TaskRetrying { .. } => "task_retrying",
            Event::TaskSkipping { .. } => "task_skipping",
            Event::TaskFailed { .. } => "task_failed",
        }
    }

    /// Create a JobStarted event.
    pub fn job_started(job: JobName) -> Self {
        Event::JobStarted {
            job,
            timestamp: Instant::now(),
        }
    }

    /// Create a JobCompleted event.
    pub fn job_completed(job: JobName, result: JobResult) -> Self {
        Event::JobCompleted {
            job,
            result,
            timestamp: Instant::now(),
        }
    }

    /// Create a JobFailed event.
    pub fn job_failed(job: JobName, error: String) -> Self {
        Event::JobFailed {
            job,
            error,
            timestamp: Instant::now(),
        }
    }

    /// Create a JobTerminated event.
    pub fn job_terminated(job: JobName, task_index: usize) -> Self {
        Event::JobTerminated {
            job,
            task_index,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskStarted event.
    pub fn task_started(job: JobName, task_index: usize) -> Self {
        Event::TaskStarted {
            job,
            task_index,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskCompleted event.
    pub fn task_completed(job: JobName, task_index: usize, duration: Duration) -> Self {
        Event::TaskCompleted {
            job,
            task_index,
            duration,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskRetrying event.
    pub fn task_retrying(job: JobName, task_index: usize, attempt: u32) -> Self {
        Event::TaskRetrying {
            job,
            task_index,
            attempt,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskSkipping event.
    pub fn task_skipping(job: JobName, task_index: usize) -> Self {
        Event::TaskSkipping {
            job,
            task_index,
            timestamp: Instant::now(),
        }
    }

    /// Create a TaskFailed event.
    pub fn task_failed(job: JobName, task_index: usize, error: String) -> Self {
        Event::TaskFailed {
            job,
            task_index,
            error,
            timestamp: Instant::now(),
        }
    }
}

/// The capability to publish lifecycle events.
///
/// This is all the engine needs from the outside world to report progress.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event.
    async fn publish(&self, event: Event);
}

/// Handler for receiving lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: &Event);
}

/// Event bus for distributing events to registered handlers.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    /// Emit an event to all registered handlers, in registration order.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Get the number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, event: Event) {
        self.emit(event).await;
    }
}
