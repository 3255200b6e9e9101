//! Job registry.
//!
//! Maps job names to their definition and run state. The registry only
//! enforces name uniqueness; claiming and releasing runs is driven by the
//! execution engine through [`JobState`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

use crate::core::job::JobDefinition;
use crate::core::types::JobName;

/// Errors that can occur when registering or looking up jobs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A job with this name is already registered.
    #[error("job name already in use: {0}")]
    NameAlreadyInUse(JobName),

    /// No job with this name is registered.
    #[error("job not found: {0}")]
    NameNotFound(JobName),
}

/// Run state of a registered job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    /// Not running.
    Idle = 0,
    /// Running.
    Running = 1,
    /// Running, with a termination request pending.
    Terminating = 2,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => RunState::Running,
            2 => RunState::Terminating,
            _ => RunState::Idle,
        }
    }
}

/// Runtime state of one registered job.
///
/// The busy and terminating flags live in a single atomic so that claiming a
/// run, requesting termination and releasing a run never race each other.
#[derive(Debug)]
pub struct JobState {
    definition: Arc<JobDefinition>,
    state: AtomicU8,
}

impl JobState {
    fn new(definition: JobDefinition) -> Self {
        Self {
            definition: Arc::new(definition),
            state: AtomicU8::new(RunState::Idle as u8),
        }
    }

    /// Get the job definition.
    pub fn definition(&self) -> &Arc<JobDefinition> {
        &self.definition
    }

    /// Get the current run state.
    pub fn run_state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Check whether a run is in flight.
    pub fn is_busy(&self) -> bool {
        self.run_state() != RunState::Idle
    }

    /// Check whether the in-flight run was asked to stop.
    pub fn is_terminating(&self) -> bool {
        self.run_state() == RunState::Terminating
    }

    /// Move `Idle -> Running`. Returns false if a run is already in flight.
    ///
    /// A successful claim starts with no termination pending.
    pub(crate) fn try_claim(&self) -> bool {
        self.state
            .compare_exchange(
                RunState::Idle as u8,
                RunState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move `Running -> Terminating`. Returns false if the job is idle.
    pub(crate) fn request_termination(&self) -> bool {
        match self.state.compare_exchange(
            RunState::Running as u8,
            RunState::Terminating as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => true,
            Err(current) => RunState::from_u8(current) == RunState::Terminating,
        }
    }

    /// Return to `Idle`, dropping any pending termination request.
    pub(crate) fn release(&self) {
        self.state.store(RunState::Idle as u8, Ordering::Release);
    }
}

/// Thread-safe mapping from job name to job state.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobName, Arc<JobState>>>,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. Fails if the name is taken; the existing job is untouched.
    pub fn register(&self, definition: JobDefinition) -> Result<Arc<JobState>, RegistryError> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if jobs.contains_key(definition.name()) {
            return Err(RegistryError::NameAlreadyInUse(definition.name().clone()));
        }
        let name = definition.name().clone();
        let state = Arc::new(JobState::new(definition));
        jobs.insert(name, Arc::clone(&state));
        Ok(state)
    }

    /// Look up a job by name.
    pub fn get(&self, name: &str) -> Result<Arc<JobState>, RegistryError> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NameNotFound(JobName::new(name)))
    }

    /// Check whether a job is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Names of all registered jobs, sorted.
    pub fn names(&self) -> Vec<JobName> {
        let mut names: Vec<JobName> = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Number of registered jobs.
    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check whether no job is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
