mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dagflow::dag::TaskState;
use dagflow::engine::{Engine, EngineOptions, EventKind};
use dagflow::errors::TaskFailure;
use dagflow::task::{TaskDefinition, TaskValue, WorkError};
use serde_json::json;

use common::{
    ConcurrencyProbe, ScriptedWork, TestResult, fast_options, init_tracing, ok_task,
    recording_engine, with_timeout,
};

fn fanout_options(instances: usize) -> EngineOptions {
    EngineOptions {
        fanout_instances: instances,
        ..fast_options()
    }
}

#[tokio::test]
async fn admission_cap_bounds_running_instances() -> TestResult {
    init_tracing();

    let probe = ConcurrencyProbe::new();
    let tasks = vec![
        TaskDefinition::builder("spread", probe.work(Duration::from_millis(40)))
            .fanout(Some(2))
            .build(),
    ];

    let result = with_timeout(Engine::new(fanout_options(5)).run(tasks)).await?;

    let report = result.get("spread").ok_or("missing report")?;
    assert_eq!(report.state, TaskState::Completed);
    assert_eq!(probe.started(), 5);
    assert_eq!(probe.peak(), 2);
    assert_eq!(report.instances.len(), 5);
    assert_eq!(report.attempts, 5);

    let values = report
        .result
        .as_ref()
        .and_then(TaskValue::as_array)
        .ok_or("fan-out result must be an array")?;
    assert_eq!(values.len(), 5);
    Ok(())
}

#[tokio::test]
async fn unset_cap_runs_every_instance_at_once() -> TestResult {
    init_tracing();

    let probe = ConcurrencyProbe::new();
    let tasks = vec![
        TaskDefinition::builder("wide", probe.work(Duration::from_millis(40)))
            .fanout(None)
            .build(),
    ];

    let result = with_timeout(Engine::new(fanout_options(4)).run(tasks)).await?;

    assert_eq!(result.state_of("wide"), Some(TaskState::Completed));
    assert_eq!(probe.peak(), 4);
    Ok(())
}

#[tokio::test]
async fn results_are_stored_at_their_instance_index() -> TestResult {
    init_tracing();

    // Later calls finish first, so completion order is the reverse of
    // instance order.
    let calls = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&calls);
    let tasks = vec![
        TaskDefinition::from_fn("indexed", move || {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis((5 - call) * 15)).await;
                Ok::<_, WorkError>(json!(call))
            }
        })
        .fanout(None)
        .build(),
    ];

    let result = with_timeout(Engine::new(fanout_options(5)).run(tasks)).await?;

    assert_eq!(
        result.get("indexed").and_then(|r| r.result.clone()),
        Some(json!([0, 1, 2, 3, 4]))
    );
    Ok(())
}

#[tokio::test]
async fn single_instance_runs_like_a_regular_task() -> TestResult {
    init_tracing();

    let tasks = vec![ok_task("solo", "x").fanout(None).build()];
    let (engine, sink) = recording_engine(fast_options());
    let result = engine.run(tasks).await?;

    let report = result.get("solo").ok_or("missing report")?;
    assert_eq!(report.state, TaskState::Completed);
    assert_eq!(report.result, Some(json!("x")));
    assert_eq!(report.attempts, 1);
    assert!(report.instances.is_empty());
    assert_eq!(
        sink.kinds_for("solo"),
        vec![EventKind::TaskStarted, EventKind::TaskCompleted]
    );
    assert_eq!(sink.messages_for("solo"), vec!["", "attempt=1"]);
    Ok(())
}

#[tokio::test]
async fn single_instance_retries_with_task_wording() -> TestResult {
    init_tracing();

    let work = ScriptedWork::failing_first(1, 5);
    let tasks = vec![TaskDefinition::builder("solo", work).retries(1).fanout(Some(1)).build()];
    let (engine, sink) = recording_engine(fanout_options(1));
    let result = engine.run(tasks).await?;

    assert_eq!(result.get("solo").and_then(|r| r.result.clone()), Some(json!(5)));
    assert_eq!(
        sink.messages_for("solo"),
        vec![
            "",
            "attempt=1 error=scripted failure #1",
            "retrying attempt=1",
            "attempt=2",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn timed_out_instances_release_their_slot() -> TestResult {
    init_tracing();

    let work = ScriptedWork::succeeding("late").with_delay(Duration::from_millis(200));
    let tasks = vec![
        TaskDefinition::builder("stalled", work.clone())
            .timeout_ms(10)
            .fanout(Some(1))
            .build(),
    ];

    let result = with_timeout(Engine::new(fanout_options(3)).run(tasks)).await?;

    assert_eq!(work.calls(), 3);
    let report = result.get("stalled").ok_or("missing report")?;
    assert_eq!(report.state, TaskState::Failed);
    match &report.failure {
        Some(TaskFailure::FanoutFailed { total, failures }) => {
            assert_eq!(*total, 3);
            assert_eq!(failures.len(), 3);
            assert!(failures.iter().all(|f| f.failure.is_timeout()));
        }
        other => panic!("expected FanoutFailed, got {other:?}"),
    }
    // A leaked slot would serialise the instances behind the 200ms sleeps.
    assert!(result.elapsed() < Duration::from_millis(300), "took {:?}", result.elapsed());
    Ok(())
}

#[tokio::test]
async fn instance_count_can_be_overridden_per_run() -> TestResult {
    init_tracing();

    let engine = Engine::new(fanout_options(2));
    let tasks = vec![ok_task("many", 7).fanout(None).build()];
    let result = engine.run_with_fanout(tasks, 3).await?;

    assert_eq!(
        result.get("many").and_then(|r| r.result.clone()),
        Some(json!([7, 7, 7]))
    );
    Ok(())
}

#[tokio::test]
async fn one_failed_instance_fails_the_task() -> TestResult {
    init_tracing();

    // Only the first call fails; on a current-thread runtime that is
    // instance 0.
    let work = ScriptedWork::failing_first(1, "ok");
    let tasks = vec![
        TaskDefinition::builder("partial", work).fanout(None).build(),
        ok_task("after", 1).after("partial").build(),
    ];

    let (engine, sink) = recording_engine(fanout_options(3));
    let result = with_timeout(engine.run(tasks)).await?;

    let report = result.get("partial").ok_or("missing report")?;
    assert_eq!(report.state, TaskState::Failed);
    assert!(report.result.is_none());
    match &report.failure {
        Some(TaskFailure::FanoutFailed { total, failures }) => {
            assert_eq!(*total, 3);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].index, 0);
        }
        other => panic!("expected FanoutFailed, got {other:?}"),
    }
    assert_eq!(report.instances.iter().filter(|i| i.succeeded()).count(), 2);
    assert_eq!(result.state_of("after"), Some(TaskState::Failed));

    let messages = sink.messages_for("partial");
    assert_eq!(messages.first().map(String::as_str), Some("fanout instances=3"));
    assert_eq!(
        messages.last().map(String::as_str),
        Some("fanout failed instances=3 failed=1")
    );
    Ok(())
}

#[tokio::test]
async fn instances_retry_independently() -> TestResult {
    init_tracing();

    let work = ScriptedWork::always_failing();
    let tasks = vec![
        TaskDefinition::builder("hopeless", work.clone())
            .retries(1)
            .fanout(Some(1))
            .build(),
    ];

    let (engine, sink) = recording_engine(fanout_options(3));
    let result = with_timeout(engine.run(tasks)).await?;

    let report = result.get("hopeless").ok_or("missing report")?;
    assert_eq!(report.state, TaskState::Failed);
    assert_eq!(report.attempts, 6);
    assert_eq!(work.calls(), 6);
    assert!(report.instances.iter().all(|i| i.attempts == 2));

    let kinds = sink.kinds_for("hopeless");
    assert_eq!(kinds.first(), Some(&EventKind::TaskStarted));
    assert_eq!(kinds.iter().filter(|k| **k == EventKind::TaskRetried).count(), 3);
    // Two failures per instance plus the aggregate.
    assert_eq!(kinds.iter().filter(|k| **k == EventKind::TaskFailed).count(), 7);
    assert!(!kinds.contains(&EventKind::TaskCompleted));
    Ok(())
}

#[tokio::test]
async fn successful_fanout_emits_one_aggregate_completion() -> TestResult {
    init_tracing();

    let tasks = vec![ok_task("fan", 1).fanout(Some(2)).build()];
    let (engine, sink) = recording_engine(fanout_options(4));
    engine.run(tasks).await?;

    assert_eq!(
        sink.kinds_for("fan"),
        vec![EventKind::TaskStarted, EventKind::TaskCompleted]
    );
    assert_eq!(
        sink.messages_for("fan"),
        vec!["fanout instances=4", "fanout completed instances=4"]
    );
    Ok(())
}
