//! Job execution engine.
//!
//! The `JobEngine` runs registered jobs one task at a time with:
//! - A per-task delay before every invocation
//! - Retry and skip handling driven by the resolved [`BehaviorPolicy`]
//! - Cooperative termination checked before every attempt
//! - Lifecycle events published through an [`EventPublisher`]

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::EngineConfig;
use crate::core::behavior::BehaviorPolicy;
use crate::core::job::JobDefinition;
use crate::core::result::JobResult;
use crate::core::task::TaskDefinition;
use crate::core::types::{JobName, RunId};
use crate::events::{Event, EventBus, EventPublisher};
use crate::registry::{JobRegistry, JobState};

use super::error::{EngineError, JobFailure};
use super::step::{Attempt, Step, decide};

/// Holds a claimed run and hands the job back to `Idle` when dropped.
///
/// Dropping covers every way out of a run: completion, terminal failure,
/// termination, a panicking task, and the caller dropping the future.
struct RunGuard {
    state: Arc<JobState>,
}

impl RunGuard {
    fn claim(state: Arc<JobState>) -> Option<Self> {
        state.try_claim().then(|| Self { state })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.release();
    }
}

/// Sequential job runner.
///
/// Share it behind an `Arc` to run different jobs concurrently or to call
/// [`JobEngine::terminate_job`] from another task.
pub struct JobEngine {
    registry: JobRegistry,
    defaults: BehaviorPolicy,
    publisher: Arc<dyn EventPublisher>,
}

impl JobEngine {
    /// Create an engine with the given engine-wide behavior defaults.
    pub fn new(defaults: BehaviorPolicy) -> Self {
        Self {
            registry: JobRegistry::new(),
            defaults,
            publisher: Arc::new(EventBus::new()),
        }
    }

    /// Create an engine from loaded configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.defaults)
    }

    /// Publish events to the given bus.
    pub fn with_event_bus(self, event_bus: EventBus) -> Self {
        self.with_publisher(Arc::new(event_bus))
    }

    /// Publish events through an arbitrary publisher.
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Get the engine-wide behavior defaults.
    pub fn defaults(&self) -> &BehaviorPolicy {
        &self.defaults
    }

    /// Get the job registry.
    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Register a job under its name.
    pub fn register(&self, definition: JobDefinition) -> Result<(), EngineError> {
        let state = self.registry.register(definition)?;
        debug!(
            job = %state.definition().name(),
            tasks = state.definition().len(),
            "job registered"
        );
        Ok(())
    }

    /// Check whether the named job has a run in flight.
    pub fn is_running(&self, name: &str) -> Result<bool, EngineError> {
        Ok(self.registry.get(name)?.is_busy())
    }

    /// Run the named job to completion and return its result.
    ///
    /// Fails only when the job is unknown or already running. Task failures
    /// are reported through events and the returned [`JobResult`].
    pub async fn execute_job(&self, name: &str) -> Result<JobResult, EngineError> {
        let state = self.registry.get(name)?;
        let definition = Arc::clone(state.definition());
        let guard = RunGuard::claim(state)
            .ok_or_else(|| EngineError::Busy(definition.name().clone()))?;

        let run_id = RunId::new();
        let span = info_span!("job", job = %definition.name(), run_id = %run_id);

        let result = async {
            let job = definition.name();
            info!(tasks = definition.len(), "job started");
            self.publisher.publish(Event::job_started(job.clone())).await;

            let mut result = JobResult::default();
            match self
                .run_tasks(&guard.state, job, definition.tasks(), &mut result)
                .await
            {
                Ok(()) => {
                    info!(
                        processed = result.processed_count,
                        skipped = result.skipped_count,
                        retried = result.retry_count,
                        terminated = result.terminated,
                        "job completed"
                    );
                    self.publisher
                        .publish(Event::job_completed(job.clone(), result))
                        .await;
                }
                Err(failure) => {
                    error!(error = %failure, "job failed");
                    self.publisher
                        .publish(Event::job_failed(job.clone(), failure.to_string()))
                        .await;
                }
            }
            result
        }
        .instrument(span)
        .await;

        Ok(result)
    }

    /// Run the named job, asking it to stop once `stop` resolves.
    ///
    /// The run is claimed before `stop` is first polled, so a signal that is
    /// already pending still terminates the job instead of racing the claim.
    pub async fn execute_job_until<S>(
        &self,
        name: &str,
        stop: S,
    ) -> Result<JobResult, EngineError>
    where
        S: Future<Output = ()>,
    {
        let run = self.execute_job(name);
        tokio::pin!(run);

        tokio::select! {
            biased;
            result = &mut run => return result,
            _ = stop => {}
        }

        if let Err(e) = self.terminate_job(name) {
            warn!(job = name, error = %e, "could not request termination");
        }
        run.await
    }

    /// Ask a running job to stop before its next task attempt.
    ///
    /// Returns immediately; the task currently delayed or executing is not
    /// interrupted.
    pub fn terminate_job(&self, name: &str) -> Result<(), EngineError> {
        let state = self.registry.get(name)?;
        if !state.request_termination() {
            return Err(EngineError::NotRunning(state.definition().name().clone()));
        }
        info!(job = %state.definition().name(), "termination requested");
        Ok(())
    }

    /// The run loop. Returns `Err` on the first terminal failure.
    async fn run_tasks(
        &self,
        state: &JobState,
        job: &JobName,
        tasks: &[TaskDefinition],
        result: &mut JobResult,
    ) -> Result<(), JobFailure> {
        let mut index = 0;
        let mut retries = 0u32;

        while let Some(task) = tasks.get(index) {
            let task_index = index + 1;

            if state.is_terminating() {
                info!(task_index, "job terminated");
                result.terminated = true;
                self.publisher
                    .publish(Event::job_terminated(job.clone(), task_index))
                    .await;
                return Ok(());
            }

            let behavior = task.behavior().resolve(&self.defaults);
            let attempt = self.invoke(job, task_index, task).await;

            match decide(attempt, retries, &behavior, task_index) {
                Step::Advance => {
                    result.processed_count += 1;
                    retries = 0;
                    index += 1;
                }
                Step::Retry { attempt } => {
                    warn!(
                        task_index,
                        attempt,
                        max_retries = behavior.max_retries,
                        "retrying task"
                    );
                    retries = attempt;
                    result.retry_count += 1;
                    self.publisher
                        .publish(Event::task_retrying(job.clone(), task_index, attempt))
                        .await;
                }
                Step::Skip => {
                    warn!(task_index, "skipping task");
                    self.publisher
                        .publish(Event::task_skipping(job.clone(), task_index))
                        .await;
                    result.skipped_count += 1;
                    retries = 0;
                    index += 1;
                }
                Step::Abort(failure) => {
                    warn!(task_index, error = %failure, "task failed");
                    result.failed_count += 1;
                    self.publisher
                        .publish(Event::task_failed(
                            job.clone(),
                            task_index,
                            failure.to_string(),
                        ))
                        .await;
                    return Err(failure);
                }
            }
        }

        Ok(())
    }

    /// Wait out the task's delay, then invoke it once.
    async fn invoke(&self, job: &JobName, task_index: usize, task: &TaskDefinition) -> Attempt {
        if !task.delay().is_zero() {
            sleep(task.delay()).await;
        }

        self.publisher
            .publish(Event::task_started(job.clone(), task_index))
            .await;
        debug!(task_index, task = task.name(), "task started");

        let started = Instant::now();
        match task.task().execute(task.data()).await {
            Ok(true) => {
                let duration = started.elapsed();
                debug!(task_index, ?duration, "task completed");
                self.publisher
                    .publish(Event::task_completed(job.clone(), task_index, duration))
                    .await;
                Attempt::Succeeded
            }
            Ok(false) => {
                debug!(task_index, "task reported failure");
                Attempt::Recoverable
            }
            Err(err) => {
                debug!(task_index, error = %err, "task raised an error");
                Attempt::Errored(err)
            }
        }
    }
}

impl Default for JobEngine {
    fn default() -> Self {
        Self::new(BehaviorPolicy::default())
    }
}
