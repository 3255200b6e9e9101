//! Task trait, task definitions and error types.
//!
//! The `Task` trait is the unit of work executed by a job. Implement it
//! directly, or wrap an async closure with [`task_fn`].

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::behavior::BehaviorPolicy;

/// Errors raised by a task implementation.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task execution failed with a message.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Task timed out.
    #[error("task timed out after {0:?}")]
    Timeout(Duration),

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// The core trait for defining executable tasks.
///
/// The outcome of [`Task::execute`] drives the job:
/// * `Ok(true)` - the task succeeded, the job moves on
/// * `Ok(false)` - recoverable failure, subject to retry and skip policy
/// * `Err(TaskError)` - terminal failure, unless `do_not_break_on_error`
///   downgrades it to a recoverable one
///
/// # Example
///
/// ```ignore
/// use tasklane::{Task, TaskError};
/// use async_trait::async_trait;
/// use serde_json::Value;
///
/// struct Ping;
///
/// #[async_trait]
/// impl Task for Ping {
///     fn name(&self) -> &str {
///         "ping"
///     }
///
///     async fn execute(&self, data: Option<&Value>) -> Result<bool, TaskError> {
///         let host = data.and_then(|d| d["host"].as_str()).unwrap_or("localhost");
///         Ok(reachable(host).await)
///     }
/// }
/// ```
#[async_trait]
pub trait Task: Send + Sync {
    /// Returns the name of this task, used in logs.
    fn name(&self) -> &str;

    /// Execute the task with its configured payload.
    async fn execute(&self, data: Option<&Value>) -> Result<bool, TaskError>;

    /// Optional description for display/logging purposes.
    fn description(&self) -> Option<&str> {
        None
    }
}

/// A task backed by an async closure.
///
/// The closure receives an owned copy of the task payload.
pub struct FnTask<F> {
    name: String,
    func: F,
}

impl<F> FnTask<F> {
    /// Wrap `func` as a task called `name`.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F, Fut> Task for FnTask<F>
where
    F: Fn(Option<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, TaskError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, data: Option<&Value>) -> Result<bool, TaskError> {
        (self.func)(data.cloned()).await
    }
}

/// Shorthand for [`FnTask::new`].
pub fn task_fn<F, Fut>(name: impl Into<String>, func: F) -> FnTask<F>
where
    F: Fn(Option<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool, TaskError>> + Send,
{
    FnTask::new(name, func)
}

/// One step of a job: the task plus its payload, delay and behavior override.
#[derive(Clone)]
pub struct TaskDefinition {
    task: Arc<dyn Task>,
    data: Option<Value>,
    delay: Duration,
    behavior: BehaviorPolicy,
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("task", &self.task.name())
            .field("data", &self.data)
            .field("delay", &self.delay)
            .field("behavior", &self.behavior)
            .finish()
    }
}

impl TaskDefinition {
    /// Create a definition with no payload, no delay and no behavior override.
    pub fn new(task: impl Task + 'static) -> Self {
        Self::from_arc(Arc::new(task))
    }

    /// Create a definition from a shared task.
    pub fn from_arc(task: Arc<dyn Task>) -> Self {
        Self {
            task,
            data: None,
            delay: Duration::ZERO,
            behavior: BehaviorPolicy::default(),
        }
    }

    /// Builder: set the payload passed to the task.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Builder: set the delay applied before every invocation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Builder: set the task-level behavior override.
    pub fn with_behavior(mut self, behavior: BehaviorPolicy) -> Self {
        self.behavior = behavior;
        self
    }

    /// Get the task.
    pub fn task(&self) -> &Arc<dyn Task> {
        &self.task
    }

    /// Get the task name.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// Get the payload.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Get the delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Get the behavior override.
    pub fn behavior(&self) -> &BehaviorPolicy {
        &self.behavior
    }
}
