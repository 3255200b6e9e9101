//! Cooperative termination tests.
//!
//! `terminate_job` only raises a flag; these tests verify the running job
//! honors it at the next task boundary and is released afterwards.

use crate::common::wait_until;

use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tasklane::testing::{FailingTask, TestHarness};
use tasklane::{
    BehaviorPolicy, EngineError, Event, JobDefinition, JobEngine, RunState, TaskDefinition,
    TaskError, task_fn,
};

fn counting_job(name: &str, calls: &Arc<AtomicUsize>, delays_ms: &[u64]) -> JobDefinition {
    let tasks = delays_ms
        .iter()
        .enumerate()
        .map(|(i, delay)| {
            let calls = Arc::clone(calls);
            let task = task_fn(format!("step_{}", i + 1), move |_: Option<Value>| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TaskError>(true)
                }
            });
            TaskDefinition::new(task).with_delay(Duration::from_millis(*delay))
        })
        .collect();
    JobDefinition::new(name, tasks)
}

/// Test: Terminating while a task is delayed stops before the next task.
#[tokio::test(start_paused = true)]
async fn test_terminate_during_delay() {
    let harness = TestHarness::new(BehaviorPolicy::default()).await;
    let calls = Arc::new(AtomicUsize::new(0));
    harness
        .register(counting_job("long", &calls, &[0, 1000, 1000, 1000]))
        .unwrap();

    let engine = Arc::clone(harness.engine());
    let run = tokio::spawn(async move { engine.execute_job("long").await });

    // Task 1 has run; task 2 is waiting out its delay
    {
        let calls = Arc::clone(&calls);
        wait_until(move || calls.load(Ordering::SeqCst) == 1, Duration::from_secs(1)).await;
    }
    harness.engine().terminate_job("long").unwrap();

    let result = run.await.unwrap().unwrap();

    // The delayed task is not aborted; task 3 never starts
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(result.terminated);
    assert_eq!(result.processed_count, 2);
    assert!(result.is_success());

    let events = harness.recorder().events().await;
    let terminated_at = events.iter().find_map(|e| match e {
        Event::JobTerminated { task_index, .. } => Some(*task_index),
        _ => None,
    });
    assert_eq!(terminated_at, Some(3));
    assert!(matches!(
        events.last(),
        Some(Event::JobCompleted { result, .. }) if result.terminated
    ));
}

/// Test: Termination is observed before a retry attempt.
#[tokio::test(start_paused = true)]
async fn test_terminate_before_retry() {
    let harness = TestHarness::new(BehaviorPolicy::new().with_max_retries(5)).await;
    let flaky = Arc::new(FailingTask::new("flaky", u32::MAX));
    harness
        .register(JobDefinition::new(
            "retrying",
            vec![TaskDefinition::from_arc(flaky.clone()).with_delay(Duration::from_millis(500))],
        ))
        .unwrap();

    let engine = Arc::clone(harness.engine());
    let run = tokio::spawn(async move { engine.execute_job("retrying").await });

    tokio::time::sleep(Duration::from_millis(700)).await;
    harness.engine().terminate_job("retrying").unwrap();

    let result = run.await.unwrap().unwrap();

    assert!(result.terminated);
    assert_eq!(flaky.call_count().await, 2);
    assert_eq!(result.retry_count, 2);
    assert_eq!(result.processed_count, 0);
    assert_eq!(result.failed_count, 0);
}

/// Test: A terminated job returns to idle and runs again from the start.
#[tokio::test(start_paused = true)]
async fn test_job_reruns_after_termination() {
    let engine = Arc::new(JobEngine::default());
    let calls = Arc::new(AtomicUsize::new(0));
    engine
        .register(counting_job("again", &calls, &[100, 100, 100]))
        .unwrap();

    let run = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.execute_job("again").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    engine.terminate_job("again").unwrap();
    // A second request while the first is pending is accepted
    engine.terminate_job("again").unwrap();

    let first = run.await.unwrap().unwrap();
    assert!(first.terminated);
    assert_eq!(first.processed_count, 1);
    assert_eq!(
        engine.registry().get("again").unwrap().run_state(),
        RunState::Idle
    );

    // The termination flag does not leak into the next run
    let second = engine.execute_job("again").await.unwrap();
    assert!(!second.terminated);
    assert_eq!(second.processed_count, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

/// Test: Terminating an idle job is rejected.
#[tokio::test]
async fn test_terminate_idle_job() {
    let engine = JobEngine::default();
    engine
        .register(JobDefinition::builder("idle").add_task(FailingTask::new("t", 0)).build())
        .unwrap();

    assert!(matches!(
        engine.terminate_job("idle"),
        Err(EngineError::NotRunning(_))
    ));

    engine.execute_job("idle").await.unwrap();

    assert!(matches!(
        engine.terminate_job("idle"),
        Err(EngineError::NotRunning(_))
    ));
}
