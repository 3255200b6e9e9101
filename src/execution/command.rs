//! External command task implementation.
//!
//! [`CommandTask`] runs an external program as a task. The exit status maps
//! onto the task outcome:
//!
//! - exit code 0 → `Ok(true)`
//! - non-zero exit code → `Ok(false)`, so retry and skip policy apply
//! - the program cannot be started → `Err(TaskError::ExecutionFailed)`
//! - the optional timeout elapses → `Err(TaskError::Timeout)`
//!
//! When the task has a payload it is passed to the process as JSON in the
//! `TASKLANE_DATA` environment variable.
//!
//! ```rust
//! use tasklane::CommandTask;
//! use std::time::Duration;
//!
//! let task = CommandTask::builder("pg_dump")
//!     .name("dump")
//!     .args(["-f", "/tmp/db.sql"])
//!     .env("PGHOST", "localhost")
//!     .timeout(Duration::from_secs(600))
//!     .build();
//!
//! assert_eq!(task.program(), "pg_dump");
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::core::task::{Task, TaskError};

/// Environment variable carrying the task payload as JSON.
pub const DATA_ENV_VAR: &str = "TASKLANE_DATA";

/// A task that executes an external command.
#[derive(Debug, Clone)]
pub struct CommandTask {
    /// Task name (used for identification)
    name: String,
    /// Program to execute
    program: String,
    /// Command arguments
    args: Vec<String>,
    /// Environment variables
    environment: BTreeMap<String, String>,
    /// Working directory
    working_dir: Option<PathBuf>,
    /// Execution timeout
    timeout: Option<Duration>,
}

impl CommandTask {
    /// Create a new builder for a command task.
    pub fn builder(program: impl Into<String>) -> CommandTaskBuilder {
        CommandTaskBuilder::new(program)
    }

    /// Get the program being executed.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the command arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Get the environment variables set for the process.
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Get the working directory.
    pub fn working_dir(&self) -> Option<&PathBuf> {
        self.working_dir.as_ref()
    }

    /// Get the timeout duration.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[async_trait]
impl Task for CommandTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, data: Option<&Value>) -> Result<bool, TaskError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(&self.environment);

        if let Some(data) = data {
            cmd.env(DATA_ENV_VAR, data.to_string());
        }

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output = match self.timeout {
            Some(duration) => timeout(duration, cmd.output())
                .await
                .map_err(|_| TaskError::Timeout(duration))?
                .map_err(|e| TaskError::ExecutionFailed(format!("{}: {}", self.program, e)))?,
            None => cmd
                .output()
                .await
                .map_err(|e| TaskError::ExecutionFailed(format!("{}: {}", self.program, e)))?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!(task = %self.name, "stdout: {}", line);
        }

        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(
            task = %self.name,
            code = output.status.code().unwrap_or(-1),
            stderr = %stderr.trim(),
            "command exited unsuccessfully"
        );
        Ok(false)
    }

    fn description(&self) -> Option<&str> {
        Some(&self.program)
    }
}

/// Builder for creating `CommandTask` instances.
#[derive(Debug, Clone)]
pub struct CommandTaskBuilder {
    name: Option<String>,
    program: String,
    args: Vec<String>,
    environment: BTreeMap<String, String>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CommandTaskBuilder {
    /// Create a new builder with the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            name: None,
            program: program.into(),
            args: Vec::new(),
            environment: BTreeMap::new(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Set the task name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a single environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the execution timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Build the `CommandTask`.
    pub fn build(self) -> CommandTask {
        let name = self.name.unwrap_or_else(|| self.program.clone());
        CommandTask {
            name,
            program: self.program,
            args: self.args,
            environment: self.environment,
            working_dir: self.working_dir,
            timeout: self.timeout,
        }
    }
}
