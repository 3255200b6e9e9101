//! tasklane - run sequential jobs defined in YAML.
//!
//! Usage:
//!   tasklane run <jobs-dir> <job>    Run one job to completion
//!   tasklane validate <jobs-dir>     Validate job configurations without running
//!   tasklane list <jobs-dir>         List all jobs in the directory

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tasklane::{
    EngineConfig, EventBus, JobEngine, LoggingHandler, YamlLoader, load_jobs_from_directory,
};
use tracing::{error, info, warn};

/// tasklane - a sequential job runner
#[derive(Parser)]
#[command(name = "tasklane")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine configuration file with behavior defaults
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a job from a directory and wait for it to finish
    Run {
        /// Path to the directory containing job YAML files
        #[arg(value_name = "JOBS_DIR")]
        jobs_dir: PathBuf,

        /// Name of the job to run
        #[arg(value_name = "JOB")]
        job: String,
    },

    /// Validate job configurations without running
    Validate {
        /// Path to the directory containing job YAML files
        #[arg(value_name = "JOBS_DIR")]
        jobs_dir: PathBuf,
    },

    /// List all jobs in the directory
    List {
        /// Path to the directory containing job YAML files
        #[arg(value_name = "JOBS_DIR")]
        jobs_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { jobs_dir, job } => run_job(cli.config.as_deref(), &jobs_dir, &job).await,
        Commands::Validate { jobs_dir } => {
            validate_jobs(cli.config.as_deref(), &jobs_dir)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::List { jobs_dir } => {
            list_jobs(&jobs_dir)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            info!("Loading engine configuration from: {}", path.display());
            Ok(YamlLoader::load_engine_config(path)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Register every job in the directory and run one of them.
///
/// Ctrl+C asks the job to stop before its next task.
async fn run_job(
    config: Option<&Path>,
    jobs_dir: &Path,
    name: &str,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = load_engine_config(config)?;
    info!("Loading jobs from: {}", jobs_dir.display());
    let jobs = load_jobs_from_directory(jobs_dir)?;

    let event_bus = EventBus::new();
    event_bus.register(Arc::new(LoggingHandler)).await;
    let engine = JobEngine::from_config(&config).with_event_bus(event_bus);

    for job in jobs {
        engine.register(job)?;
    }

    if !engine.registry().contains(name) {
        error!("Job '{}' not found", name);
        error!(
            "Available jobs: {}",
            engine
                .registry()
                .names()
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        return Ok(ExitCode::FAILURE);
    }

    info!("Press Ctrl+C to stop");
    let stop = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Stopping job '{}' before its next task...", name),
            Err(e) => {
                warn!("Could not listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await
            }
        }
    };
    let result = engine.execute_job_until(name, stop).await?;

    if result.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Validate job configurations without running.
fn validate_jobs(
    config: Option<&Path>,
    jobs_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    load_engine_config(config)?;
    info!("Validating jobs in: {}", jobs_dir.display());

    match load_jobs_from_directory(jobs_dir) {
        Ok(jobs) => {
            info!("All {} job(s) are valid:", jobs.len());
            for job in &jobs {
                info!("  - {} ({} task(s)): OK", job.name(), job.len());
            }
            Ok(())
        }
        Err(e) => {
            error!("Validation failed: {}", e);
            Err(e.into())
        }
    }
}

/// List all jobs in the directory.
fn list_jobs(jobs_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let jobs = load_jobs_from_directory(jobs_dir)?;

    if jobs.is_empty() {
        println!("No jobs found in {}", jobs_dir.display());
        return Ok(());
    }

    println!("Jobs in {}:", jobs_dir.display());
    println!();

    for job in &jobs {
        println!("Name: {}", job.name());
        println!("  Tasks: {}", job.len());

        for (i, task) in job.tasks().iter().enumerate() {
            let mut details = Vec::new();
            if let Some(program) = task.task().description() {
                details.push(format!("runs {}", program));
            }
            if !task.delay().is_zero() {
                details.push(format!("delay {:?}", task.delay()));
            }
            if !task.behavior().is_empty() {
                details.push(format!("{:?}", task.behavior()));
            }

            if details.is_empty() {
                println!("    {}. {}", i + 1, task.name());
            } else {
                println!("    {}. {} ({})", i + 1, task.name(), details.join(", "));
            }
        }

        println!();
    }

    Ok(())
}
