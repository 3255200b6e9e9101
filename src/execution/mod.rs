//! Job execution.
//!
//! This module provides the engine that runs jobs task by task, the errors
//! it reports, and the external command task.

mod command;
mod engine;
mod error;
mod step;

pub use command::{CommandTask, CommandTaskBuilder, DATA_ENV_VAR};
pub use engine::JobEngine;
pub use error::{EngineError, JobFailure};
