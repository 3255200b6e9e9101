//! Job definitions.
//!
//! A job is a named, ordered list of tasks executed one after another.

use super::task::{Task, TaskDefinition};
use super::types::JobName;

/// An immutable job definition: a unique name and its ordered tasks.
#[derive(Debug, Clone)]
pub struct JobDefinition {
    name: JobName,
    tasks: Vec<TaskDefinition>,
}

impl JobDefinition {
    /// Create a job from a name and its tasks.
    pub fn new(name: impl Into<JobName>, tasks: Vec<TaskDefinition>) -> Self {
        Self {
            name: name.into(),
            tasks,
        }
    }

    /// Start building a job with the given name.
    pub fn builder(name: impl Into<JobName>) -> JobBuilder {
        JobBuilder::new(name)
    }

    /// Get the job name.
    pub fn name(&self) -> &JobName {
        &self.name
    }

    /// Get the tasks in execution order.
    pub fn tasks(&self) -> &[TaskDefinition] {
        &self.tasks
    }

    /// Number of tasks in the job.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check whether the job has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Builder for [`JobDefinition`].
#[derive(Debug)]
pub struct JobBuilder {
    name: JobName,
    tasks: Vec<TaskDefinition>,
}

impl JobBuilder {
    /// Create a builder for a job with the given name.
    pub fn new(name: impl Into<JobName>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    /// Append a fully configured task definition.
    pub fn add(mut self, task: TaskDefinition) -> Self {
        self.tasks.push(task);
        self
    }

    /// Append a task with no payload, delay or behavior override.
    pub fn add_task(self, task: impl Task + 'static) -> Self {
        self.add(TaskDefinition::new(task))
    }

    /// Build the job.
    pub fn build(self) -> JobDefinition {
        JobDefinition::new(self.name, self.tasks)
    }
}
