//! End-to-end execution tests.
//!
//! These tests run whole jobs through the engine and check the aggregated
//! result, the event stream and the timing of delayed tasks.

use crate::common::{Ledger, LedgerTask};

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tasklane::testing::{FailingTask, TestHarness};
use tasklane::{
    BehaviorPolicy, EngineError, Event, JobDefinition, JobEngine, TaskDefinition, TaskError,
    task_fn,
};

/// Test: Delays accumulate sequentially across tasks.
#[tokio::test(start_paused = true)]
async fn test_delays_accumulate_sequentially() {
    let ledger = Ledger::new();
    let tasks = [("a", 0, 500), ("b", 2000, 50), ("c", 1000, 20), ("d", 1000, 250)]
        .into_iter()
        .map(|(label, delay_ms, increment)| {
            TaskDefinition::new(LedgerTask::new(label, increment, &ledger))
                .with_delay(Duration::from_millis(delay_ms))
        })
        .collect();

    let engine = JobEngine::default();
    engine.register(JobDefinition::new("ledger", tasks)).unwrap();

    let result = engine.execute_job("ledger").await.unwrap();

    assert_eq!(result.processed_count, 4);
    assert_eq!(ledger.total(), 820);
    assert_eq!(ledger.labels(), vec!["a", "b", "c", "d"]);

    let third = ledger.observed("c").unwrap();
    assert!(third >= Duration::from_millis(3000), "third task at {:?}", third);
    assert!(third < Duration::from_millis(3100), "third task at {:?}", third);

    let total = ledger.elapsed();
    assert!(total >= Duration::from_millis(4000), "total {:?}", total);
    assert!(total < Duration::from_millis(4100), "total {:?}", total);
}

/// Test: A mixed job retries, skips and completes with consistent counts.
#[tokio::test]
async fn test_mixed_job_counts() {
    let defaults = BehaviorPolicy::new()
        .with_max_retries(2)
        .with_skip_item_on_fail(true);
    let harness = TestHarness::new(defaults).await;
    harness
        .register(
            JobDefinition::builder("mixed")
                .add_task(FailingTask::new("steady", 0))
                .add_task(FailingTask::new("flaky", 2))
                .add_task(FailingTask::new("hopeless", u32::MAX))
                .add_task(FailingTask::new("last", 0))
                .build(),
        )
        .unwrap();

    let run = harness.execute_and_assert_success("mixed").await;

    assert_eq!(run.result.processed_count, 3);
    assert_eq!(run.result.skipped_count, 1);
    assert_eq!(run.result.retry_count, 4);
    assert_eq!(run.result.failed_count, 0);
    assert!(run.result.processed_count + run.result.skipped_count <= 4);

    let skipped: Vec<usize> = run
        .events
        .iter()
        .filter(|e| e.kind() == "task_skipping")
        .filter_map(Event::task_index)
        .collect();
    assert_eq!(skipped, vec![3]);

    match run.events.last() {
        Some(Event::JobCompleted { result, .. }) => assert_eq!(*result, run.result),
        other => panic!("Expected JobCompleted event, got {:?}", other),
    }
}

/// Test: A terminal failure stops the job and never reaches the caller.
#[tokio::test]
async fn test_terminal_failure_is_reported_through_events() {
    let harness = TestHarness::new(BehaviorPolicy::default()).await;
    let never = Arc::new(FailingTask::new("never", 0));
    harness
        .register(JobDefinition::new(
            "broken",
            vec![
                TaskDefinition::new(FailingTask::new("ok", 0)),
                TaskDefinition::new(FailingTask::with_error("boom", u32::MAX, "no route")),
                TaskDefinition::from_arc(never.clone()),
            ],
        ))
        .unwrap();

    let run = harness.execute_and_assert_failure("broken").await;

    assert_eq!(run.result.processed_count, 1);
    assert_eq!(run.result.failed_count, 1);
    assert_eq!(never.call_count().await, 0);
    assert_eq!(
        run.kinds(),
        vec![
            "job_started",
            "task_started",
            "task_completed",
            "task_started",
            "task_failed",
            "job_failed",
        ]
    );
    match &run.events[4] {
        Event::TaskFailed {
            task_index, error, ..
        } => {
            assert_eq!(*task_index, 2);
            assert_eq!(error, "task #2 raised an error: execution failed: no route");
        }
        other => panic!("Expected TaskFailed event, got {:?}", other),
    }
}

/// Test: Different jobs run concurrently on one engine.
#[tokio::test(start_paused = true)]
async fn test_different_jobs_run_concurrently() {
    let engine = Arc::new(JobEngine::default());
    for name in ["left", "right"] {
        let task = task_fn("wait", |_: Option<Value>| async { Ok::<_, TaskError>(true) });
        engine
            .register(JobDefinition::new(
                name,
                vec![TaskDefinition::new(task).with_delay(Duration::from_secs(5))],
            ))
            .unwrap();
    }

    let started = tokio::time::Instant::now();
    let left = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.execute_job("left").await }
    });
    let right = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.execute_job("right").await }
    });

    assert!(left.await.unwrap().unwrap().is_success());
    assert!(right.await.unwrap().unwrap().is_success());
    assert!(started.elapsed() < Duration::from_secs(6));
}

/// Test: The same job cannot be entered twice.
#[tokio::test(start_paused = true)]
async fn test_same_job_is_not_reentrant() {
    let engine = Arc::new(JobEngine::default());
    let task = task_fn("wait", |_: Option<Value>| async { Ok::<_, TaskError>(true) });
    engine
        .register(JobDefinition::new(
            "single",
            vec![TaskDefinition::new(task).with_delay(Duration::from_secs(1))],
        ))
        .unwrap();

    let first = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.execute_job("single").await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(matches!(
        engine.execute_job("single").await,
        Err(EngineError::Busy(_))
    ));
    assert!(first.await.unwrap().is_ok());

    // Released again once the first run finished
    assert!(engine.execute_job("single").await.is_ok());
}

/// Test: Payload data set on a definition reaches every attempt.
#[tokio::test]
async fn test_payload_is_passed_on_retry() {
    let harness = TestHarness::new(BehaviorPolicy::new().with_max_retries(2)).await;
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let task = task_fn("collect", {
        let seen = Arc::clone(&seen);
        move |data: Option<Value>| {
            let seen = Arc::clone(&seen);
            async move {
                let mut seen = seen.lock().unwrap();
                seen.push(data);
                Ok::<_, TaskError>(seen.len() == 3)
            }
        }
    });
    harness
        .register(JobDefinition::new(
            "payload",
            vec![TaskDefinition::new(task).with_data(serde_json::json!({ "id": 9 }))],
        ))
        .unwrap();

    let run = harness.execute_and_assert_success("payload").await;

    assert_eq!(run.result.retry_count, 2);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|d| d == &Some(serde_json::json!({ "id": 9 }))));
}
