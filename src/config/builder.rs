//! Job builder from YAML configuration.
//!
//! This module converts [`JobConfig`] into runnable [`JobDefinition`]s.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::job::JobDefinition;
use crate::core::task::TaskDefinition;
use crate::execution::CommandTask;

use super::error::ConfigError;
use super::yaml::{JobConfig, TaskConfig, YamlLoader};

/// Builder for creating jobs from YAML configuration.
pub struct JobConfigBuilder;

impl JobConfigBuilder {
    /// Build a job from a `JobConfig`.
    ///
    /// The config is expected to have passed [`YamlLoader`] validation.
    pub fn build(config: JobConfig) -> JobDefinition {
        let tasks = config.tasks.iter().map(Self::build_task).collect();
        JobDefinition::new(config.name, tasks)
    }

    /// Build a task definition backed by a [`CommandTask`].
    fn build_task(config: &TaskConfig) -> TaskDefinition {
        let mut builder = CommandTask::builder(&config.command)
            .name(&config.name)
            .args(&config.args);

        for (key, value) in &config.environment {
            builder = builder.env(key, value);
        }

        if let Some(dir) = &config.working_dir {
            builder = builder.working_dir(dir);
        }

        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }

        let mut task = TaskDefinition::new(builder.build())
            .with_delay(config.delay())
            .with_behavior(config.behavior);

        if let Some(data) = &config.data {
            task = task.with_data(data.clone());
        }

        task
    }
}

/// Load all job configurations from a directory.
///
/// Every `*.yaml` and `*.yml` file is one job. Files are read in name order
/// and two files declaring the same job name are rejected.
pub fn load_jobs_from_directory(dir: impl AsRef<Path>) -> Result<Vec<JobDefinition>, ConfigError> {
    let dir = dir.as_ref();

    if !dir.is_dir() {
        return Err(ConfigError::InvalidConfig(format!(
            "'{}' is not a directory",
            dir.display()
        )));
    }

    let dir_error = |source: std::io::Error| ConfigError::DirRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(dir_error)? {
        let path = entry.map_err(dir_error)?.path();

        if path.is_file()
            && let Some(ext) = path.extension()
            && (ext == "yaml" || ext == "yml")
        {
            paths.push(path);
        }
    }
    paths.sort();

    let mut names = HashSet::new();
    let mut jobs = Vec::with_capacity(paths.len());
    for path in paths {
        let config = YamlLoader::load_job_config(&path)?;
        if !names.insert(config.name.clone()) {
            return Err(ConfigError::InvalidConfig(format!(
                "{}: duplicate job name '{}'",
                path.display(),
                config.name
            )));
        }

        debug!(path = %path.display(), job = %config.name, "loaded job file");
        jobs.push(JobConfigBuilder::build(config));
    }

    Ok(jobs)
}
