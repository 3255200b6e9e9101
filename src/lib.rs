//! tasklane - a sequential job runner.
//!
//! A job is an ordered list of tasks registered under a unique name. The
//! [`JobEngine`] runs one job at a time per name, applying a per-task delay,
//! retry and skip policy resolved from task and engine defaults, and
//! cooperative termination. Progress is published as [`Event`]s.
//!
//! ```ignore
//! use tasklane::{BehaviorPolicy, JobDefinition, JobEngine, TaskDefinition, task_fn};
//!
//! let engine = JobEngine::new(BehaviorPolicy::new().with_max_retries(2));
//! engine.register(
//!     JobDefinition::builder("nightly")
//!         .add_task(task_fn("ping", |_| async { Ok(true) }))
//!         .build(),
//! )?;
//!
//! let result = engine.execute_job("nightly").await?;
//! assert!(result.is_success());
//! ```

pub mod config;
pub mod core;
pub mod events;
pub mod execution;
pub mod registry;
pub mod testing;

pub use config::{
    ConfigError, EngineConfig, JobConfig, JobConfigBuilder, TaskConfig, YamlLoader,
    load_jobs_from_directory,
};
pub use core::behavior::{BehaviorPolicy, ResolvedBehavior};
pub use core::job::{JobBuilder, JobDefinition};
pub use core::result::JobResult;
pub use core::task::{FnTask, Task, TaskDefinition, TaskError, task_fn};
pub use core::types::{JobName, RunId};
pub use events::{Event, EventBus, EventHandler, EventPublisher, LoggingHandler};
pub use execution::{
    CommandTask, CommandTaskBuilder, DATA_ENV_VAR, EngineError, JobEngine, JobFailure,
};
pub use registry::{JobRegistry, JobState, RegistryError, RunState};
