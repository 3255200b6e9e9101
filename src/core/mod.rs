//! Core domain types: identifiers, behavior policy, tasks, jobs and results.

pub mod behavior;
pub mod job;
pub mod result;
pub mod task;
pub mod types;
