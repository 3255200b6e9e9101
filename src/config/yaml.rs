//! YAML configuration parsing.
//!
//! Parses the engine configuration and job definitions from YAML files.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::behavior::BehaviorPolicy;

use super::error::ConfigError;

/// Engine configuration (tasklane.yaml).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Engine-wide behavior defaults for every task.
    pub defaults: BehaviorPolicy,
}

/// Job configuration from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Job name, unique within the engine.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Tasks, run in order.
    pub tasks: Vec<TaskConfig>,
}

/// Task configuration.
///
/// Every task runs an external command; see [`crate::CommandTask`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Task name.
    pub name: String,
    /// Program to run.
    pub command: String,
    /// Command arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Delay before every invocation, in milliseconds.
    #[serde(default)]
    pub delay_ms: u64,
    /// Timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Environment variables for the process.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Working directory.
    pub working_dir: Option<PathBuf>,
    /// Payload handed to the task.
    pub data: Option<Value>,
    /// Task-level behavior overrides.
    #[serde(default)]
    pub behavior: BehaviorPolicy,
}

impl TaskConfig {
    /// The delay as a [`Duration`].
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// The timeout as a [`Duration`], if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// YAML configuration loader.
pub struct YamlLoader;

impl YamlLoader {
    /// Load the engine configuration from a file.
    pub fn load_engine_config(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
        let path = path.as_ref();
        let content = read_file(path)?;
        Self::parse_engine_config(&content).map_err(|e| with_path(e, path))
    }

    /// Parse the engine configuration from a YAML string.
    ///
    /// An empty document yields the default configuration.
    pub fn parse_engine_config(yaml: &str) -> Result<EngineConfig, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(EngineConfig::default());
        }
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load a job configuration from a file.
    pub fn load_job_config(path: impl AsRef<Path>) -> Result<JobConfig, ConfigError> {
        let path = path.as_ref();
        let content = read_file(path)?;
        Self::parse_job_config(&content).map_err(|e| with_path(e, path))
    }

    /// Parse a job configuration from a YAML string.
    pub fn parse_job_config(yaml: &str) -> Result<JobConfig, ConfigError> {
        let config: JobConfig = serde_yaml::from_str(yaml)?;
        Self::validate_job_config(&config)?;
        Ok(config)
    }

    /// Validate a job configuration.
    fn validate_job_config(config: &JobConfig) -> Result<(), ConfigError> {
        if config.name.trim().is_empty() {
            return Err(ConfigError::MissingField("name".into()));
        }

        if config.tasks.is_empty() {
            return Err(ConfigError::InvalidConfig(format!(
                "job '{}' must have at least one task",
                config.name
            )));
        }

        for (i, task) in config.tasks.iter().enumerate() {
            let index = i + 1;
            if task.name.trim().is_empty() {
                return Err(ConfigError::MissingField(format!("tasks[{}].name", index)));
            }
            if task.command.trim().is_empty() {
                return Err(ConfigError::MissingField(format!(
                    "tasks[{}].command",
                    index
                )));
            }
            // A zero timeout would fail every attempt before the process starts
            if task.timeout_secs == Some(0) {
                return Err(ConfigError::InvalidConfig(format!(
                    "task '{}' timeout_secs cannot be zero",
                    task.name
                )));
            }
        }

        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.to_path_buf(),
        source,
    })
}

fn with_path(err: ConfigError, path: &Path) -> ConfigError {
    match err {
        ConfigError::Yaml(source) => ConfigError::YamlFile {
            path: path.to_path_buf(),
            source,
        },
        ConfigError::InvalidConfig(msg) => {
            ConfigError::InvalidConfig(format!("{}: {}", path.display(), msg))
        }
        ConfigError::MissingField(field) => ConfigError::InvalidConfig(format!(
            "{}: missing required field: {}",
            path.display(),
            field
        )),
        other => other,
    }
}
