//! Testing utilities for users of the tasklane library.
//!
//! This module provides helpers for testing jobs:
//!
//! - [`FailingTask`]: A task that fails N times then succeeds
//! - [`RecordingHandler`]: An event handler that keeps every event it sees
//! - [`TestHarness`]: Runs jobs on an engine wired to a recording handler

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::core::behavior::BehaviorPolicy;
use crate::core::job::JobDefinition;
use crate::core::result::JobResult;
use crate::core::task::{Task, TaskError};
use crate::events::{Event, EventBus, EventHandler};
use crate::execution::{EngineError, JobEngine};

/// How a [`FailingTask`] fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureMode {
    /// Return `Ok(false)`.
    ReturnFalse,
    /// Return `Err(TaskError::ExecutionFailed(message))`.
    Error(String),
}

/// A task that fails a configurable number of times before succeeding.
///
/// Useful for testing retry, skip and abort handling.
///
/// # Example
///
/// ```
/// use tasklane::testing::FailingTask;
///
/// // Returns false twice, then true on the 3rd attempt
/// let task = FailingTask::new("flaky_task", 2);
///
/// // Raises an error on every attempt
/// let broken = FailingTask::with_error("broken", u32::MAX, "disk full");
/// ```
pub struct FailingTask {
    name: String,
    state: Mutex<FailingTaskState>,
    total_failures: u32,
    mode: FailureMode,
}

struct FailingTaskState {
    failures_remaining: u32,
    call_count: u32,
}

impl FailingTask {
    /// Create a task that returns `false` `fail_count` times then `true`.
    pub fn new(name: impl Into<String>, fail_count: u32) -> Self {
        Self::with_mode(name, fail_count, FailureMode::ReturnFalse)
    }

    /// Create a task that raises an error `fail_count` times then returns `true`.
    pub fn with_error(
        name: impl Into<String>,
        fail_count: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::with_mode(name, fail_count, FailureMode::Error(message.into()))
    }

    /// Create a task that fails `fail_count` times in the given mode.
    pub fn with_mode(name: impl Into<String>, fail_count: u32, mode: FailureMode) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(FailingTaskState {
                failures_remaining: fail_count,
                call_count: 0,
            }),
            total_failures: fail_count,
            mode,
        }
    }

    /// Get the number of failures remaining before success.
    pub async fn failures_remaining(&self) -> u32 {
        self.state.lock().await.failures_remaining
    }

    /// Get the number of times this task has been called.
    pub async fn call_count(&self) -> u32 {
        self.state.lock().await.call_count
    }

    /// Reset the failure counter for reuse.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.failures_remaining = self.total_failures;
        state.call_count = 0;
    }
}

#[async_trait]
impl Task for FailingTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _data: Option<&Value>) -> Result<bool, TaskError> {
        let mut state = self.state.lock().await;
        state.call_count += 1;

        if state.failures_remaining == 0 {
            return Ok(true);
        }
        state.failures_remaining -= 1;

        match &self.mode {
            FailureMode::ReturnFalse => Ok(false),
            FailureMode::Error(message) => Err(TaskError::ExecutionFailed(message.clone())),
        }
    }
}

/// Event handler that records every event it receives.
#[derive(Default)]
pub struct RecordingHandler {
    events: Mutex<Vec<Event>>,
}

impl RecordingHandler {
    /// Create an empty recorder, ready to be registered on a bus.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All events received so far, in order.
    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    /// Kinds of all events received so far, in order.
    pub async fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().await.iter().map(Event::kind).collect()
    }

    /// Number of events of the given kind.
    pub async fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    /// Forget all recorded events.
    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: &Event) {
        self.events.lock().await.push(event.clone());
    }
}

/// A test harness running jobs on an engine whose events are recorded.
///
/// # Example
///
/// ```ignore
/// use tasklane::testing::{FailingTask, TestHarness};
/// use tasklane::{BehaviorPolicy, JobDefinition};
///
/// let harness = TestHarness::new(BehaviorPolicy::new().with_max_retries(1)).await;
/// harness.register(JobDefinition::builder("flaky").add_task(FailingTask::new("t", 1)).build())?;
///
/// let run = harness.execute("flaky").await?;
/// assert_eq!(run.result.retry_count, 1);
/// assert_eq!(run.kinds(), vec!["job_started", "task_started", /* ... */]);
/// ```
pub struct TestHarness {
    engine: Arc<JobEngine>,
    recorder: Arc<RecordingHandler>,
}

/// Result from TestHarness execution.
#[derive(Debug)]
pub struct TestResult {
    /// The job result returned by the engine.
    pub result: JobResult,
    /// Events published during the run.
    pub events: Vec<Event>,
}

impl TestResult {
    /// Kinds of the events published during the run, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.iter().map(Event::kind).collect()
    }
}

impl TestHarness {
    /// Create a harness whose engine uses the given defaults.
    pub async fn new(defaults: BehaviorPolicy) -> Self {
        let recorder = RecordingHandler::new();
        let bus = EventBus::new();
        bus.register(recorder.clone()).await;

        Self {
            engine: Arc::new(JobEngine::new(defaults).with_event_bus(bus)),
            recorder,
        }
    }

    /// Get the underlying engine.
    pub fn engine(&self) -> &Arc<JobEngine> {
        &self.engine
    }

    /// Get the event recorder.
    pub fn recorder(&self) -> &Arc<RecordingHandler> {
        &self.recorder
    }

    /// Register a job with the engine.
    pub fn register(&self, job: JobDefinition) -> Result<(), EngineError> {
        self.engine.register(job)
    }

    /// Execute a job, returning its result and the events it published.
    pub async fn execute(&self, name: &str) -> Result<TestResult, EngineError> {
        self.recorder.clear().await;
        let result = self.engine.execute_job(name).await?;
        Ok(TestResult {
            result,
            events: self.recorder.events().await,
        })
    }

    /// Execute and assert the run had no terminal failure.
    pub async fn execute_and_assert_success(&self, name: &str) -> TestResult {
        let run = self.execute(name).await.expect("job should start");
        assert!(
            run.result.is_success(),
            "Expected job to succeed, but it failed. Events: {:?}",
            run.kinds()
        );
        run
    }

    /// Execute and assert the run ended in a terminal failure.
    pub async fn execute_and_assert_failure(&self, name: &str) -> TestResult {
        let run = self.execute(name).await.expect("job should start");
        assert!(
            !run.result.is_success(),
            "Expected job to fail, but it succeeded. Events: {:?}",
            run.kinds()
        );
        run
    }
}
