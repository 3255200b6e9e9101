//! YAML-to-execution tests.
//!
//! These tests load engine configuration and job files from disk and run the
//! resulting command jobs end to end.

use std::path::Path;
use tasklane::testing::RecordingHandler;
use tasklane::{
    ConfigError, EngineError, EventBus, JobEngine, JobName, RegistryError, YamlLoader,
    load_jobs_from_directory,
};

fn write(dir: &Path, file: &str, content: &str) {
    std::fs::write(dir.join(file), content).unwrap();
}

/// Test: Engine defaults from a file apply to jobs loaded from a directory.
#[cfg(unix)]
#[tokio::test]
async fn test_yaml_job_uses_engine_defaults() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "tasklane.yaml",
        "defaults:\n  max_retries: 1\n  skip_item_on_fail: true\n",
    );
    let jobs_dir = dir.path().join("jobs");
    std::fs::create_dir(&jobs_dir).unwrap();
    write(
        &jobs_dir,
        "pipeline.yaml",
        r#"
name: pipeline
tasks:
  - name: prepare
    command: "true"
  - name: broken
    command: "false"
  - name: finish
    command: sh
    args: ["-c", "exit 0"]
"#,
    );

    let config = YamlLoader::load_engine_config(dir.path().join("tasklane.yaml")).unwrap();
    let recorder = RecordingHandler::new();
    let bus = EventBus::new();
    bus.register(recorder.clone()).await;
    let engine = JobEngine::from_config(&config).with_event_bus(bus);
    for job in load_jobs_from_directory(&jobs_dir).unwrap() {
        engine.register(job).unwrap();
    }

    let result = engine.execute_job("pipeline").await.unwrap();

    assert_eq!(result.processed_count, 2);
    assert_eq!(result.skipped_count, 1);
    assert_eq!(result.retry_count, 1);
    assert_eq!(recorder.count("task_skipping").await, 1);
}

/// Test: A task-level override in YAML beats the engine default.
#[cfg(unix)]
#[tokio::test]
async fn test_yaml_task_override() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "strict.yaml",
        r#"
name: strict
tasks:
  - name: must_pass
    command: "false"
    behavior:
      skip_item_on_fail: false
  - name: unreachable
    command: "true"
"#,
    );

    let config = YamlLoader::parse_engine_config("defaults:\n  skip_item_on_fail: true\n").unwrap();
    let engine = JobEngine::from_config(&config);
    for job in load_jobs_from_directory(dir.path()).unwrap() {
        engine.register(job).unwrap();
    }

    let result = engine.execute_job("strict").await.unwrap();

    assert_eq!(result.failed_count, 1);
    assert_eq!(result.processed_count, 0);
}

/// Test: Job payloads reach command tasks as JSON.
#[cfg(unix)]
#[tokio::test]
async fn test_yaml_payload_reaches_command() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "payload.yaml",
        r#"
name: payload
tasks:
  - name: check
    command: sh
    args: ["-c", "test \"$TASKLANE_DATA\" = '{\"table\":\"users\"}'"]
    data:
      table: users
"#,
    );

    let engine = JobEngine::default();
    for job in load_jobs_from_directory(dir.path()).unwrap() {
        engine.register(job).unwrap();
    }

    let result = engine.execute_job("payload").await.unwrap();

    assert!(result.is_success());
    assert_eq!(result.processed_count, 1);
}

/// Test: A spawn error is terminal unless downgraded.
#[tokio::test]
async fn test_missing_program_in_yaml() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "missing.yaml",
        r#"
name: missing
tasks:
  - name: ghost
    command: tasklane-no-such-program
"#,
    );

    let engine = JobEngine::default();
    for job in load_jobs_from_directory(dir.path()).unwrap() {
        engine.register(job).unwrap();
    }

    let result = engine.execute_job("missing").await.unwrap();

    assert_eq!(result.failed_count, 1);
}

/// Test: Registering the same directory twice collides on names.
#[test]
fn test_registering_directory_twice() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "job.yaml",
        "name: once\ntasks:\n  - name: t\n    command: echo\n",
    );

    let engine = JobEngine::default();
    for job in load_jobs_from_directory(dir.path()).unwrap() {
        engine.register(job).unwrap();
    }

    let job = load_jobs_from_directory(dir.path()).unwrap().remove(0);
    let err = engine.register(job).unwrap_err();

    assert_eq!(
        err,
        EngineError::Registry(RegistryError::NameAlreadyInUse(JobName::new("once")))
    );
}

/// Test: Malformed job files are reported with their path.
#[test]
fn test_malformed_job_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "bad.yaml", "name: bad\ntasks: not-a-list\n");

    let err = load_jobs_from_directory(dir.path()).unwrap_err();

    match err {
        ConfigError::YamlFile { path, .. } => assert!(path.ends_with("bad.yaml")),
        other => panic!("Expected YamlFile error, got {:?}", other),
    }
}
