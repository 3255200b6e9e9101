//! Configuration loading and parsing.
//!
//! Engine-wide defaults and job definitions are read from YAML files.

mod builder;
mod error;
mod yaml;

pub use builder::{JobConfigBuilder, load_jobs_from_directory};
pub use error::ConfigError;
pub use yaml::{EngineConfig, JobConfig, TaskConfig, YamlLoader};
