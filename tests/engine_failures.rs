mod common;

use dagflow::dag::TaskState;
use dagflow::engine::{Engine, EngineOptions, EventKind};
use dagflow::errors::{DagflowError, TaskFailure};
use dagflow::task::TaskDefinition;

use common::{
    ScriptedWork, TestResult, failing_task, fast_options, init_tracing, ok_task, recording_engine,
};

#[tokio::test]
async fn failure_propagates_to_transitive_dependents_only() -> TestResult {
    init_tracing();

    let never = ScriptedWork::succeeding(0);
    let tasks = vec![
        failing_task("root", "broken").build(),
        TaskDefinition::builder("child", never.clone()).after("root").build(),
        TaskDefinition::builder("grandchild", never.clone()).after("child").build(),
        ok_task("bystander", 1).build(),
    ];

    let (engine, sink) = recording_engine(fast_options());
    let result = engine.run(tasks).await?;

    assert_eq!(result.state_of("root"), Some(TaskState::Failed));
    assert_eq!(result.state_of("child"), Some(TaskState::Failed));
    assert_eq!(result.state_of("grandchild"), Some(TaskState::Failed));
    assert_eq!(result.state_of("bystander"), Some(TaskState::Completed));
    assert_eq!(never.calls(), 0);

    let child = result.get("child").ok_or("missing child")?;
    assert_eq!(
        child.failure,
        Some(TaskFailure::DependencyFailed {
            task: "child".to_string(),
            dependency: "root".to_string(),
        })
    );
    assert_eq!(child.attempts, 0);
    assert_eq!(
        child.error_message().as_deref(),
        Some("Dependency failed for task child")
    );

    let grandchild = result.get("grandchild").ok_or("missing grandchild")?;
    assert!(matches!(
        &grandchild.failure,
        Some(TaskFailure::DependencyFailed { dependency, .. }) if dependency == "child"
    ));

    // Dependency failures are announced without a start event.
    assert_eq!(sink.kinds_for("child"), vec![EventKind::TaskFailed]);
    assert_eq!(sink.messages_for("child"), vec!["dependency failed"]);
    assert!(!result.is_success());
    Ok(())
}

#[tokio::test]
async fn one_failed_dependency_is_enough_to_block() -> TestResult {
    init_tracing();

    let tasks = vec![
        ok_task("good", 1).parallel().build(),
        failing_task("bad", "nope").parallel().build(),
        ok_task("join", 2).after_all(["good", "bad"]).build(),
    ];

    let result = Engine::new(fast_options()).run(tasks).await?;

    assert_eq!(result.state_of("good"), Some(TaskState::Completed));
    assert_eq!(result.state_of("join"), Some(TaskState::Failed));
    assert!(
        result
            .get("join")
            .and_then(|r| r.failure.as_ref())
            .is_some_and(TaskFailure::is_dependency_failure)
    );
    Ok(())
}

#[tokio::test]
async fn cycles_leave_tasks_pending_without_running_them() -> TestResult {
    init_tracing();

    let work = ScriptedWork::succeeding(0);
    let tasks = vec![
        TaskDefinition::builder("a", work.clone()).after("b").build(),
        TaskDefinition::builder("b", work.clone()).after("a").build(),
        TaskDefinition::builder("downstream", work.clone()).after("a").build(),
        ok_task("free", 1).build(),
    ];

    let (engine, sink) = recording_engine(fast_options());
    let result = engine.run(tasks).await?;

    assert_eq!(result.pending(), vec!["a", "b", "downstream"]);
    assert_eq!(result.completed(), vec!["free"]);
    assert_eq!(work.calls(), 0);
    assert!(sink.kinds_for("a").is_empty());
    assert!(!result.is_success());
    Ok(())
}

#[tokio::test]
async fn self_dependency_stays_pending() -> TestResult {
    init_tracing();

    let tasks = vec![ok_task("ouroboros", 1).after("ouroboros").build()];
    let result = Engine::new(fast_options()).run(tasks).await?;

    assert_eq!(result.state_of("ouroboros"), Some(TaskState::Pending));
    Ok(())
}

#[tokio::test]
async fn unknown_dependency_stays_pending() -> TestResult {
    init_tracing();

    let tasks = vec![
        ok_task("orphan", 1).after("ghost").build(),
        ok_task("fine", 2).build(),
    ];
    let result = Engine::new(fast_options()).run(tasks).await?;

    assert_eq!(result.state_of("orphan"), Some(TaskState::Pending));
    assert_eq!(result.state_of("fine"), Some(TaskState::Completed));
    assert!(result.get("orphan").is_some_and(|r| r.failure.is_none()));
    Ok(())
}

#[tokio::test]
async fn strict_graph_rejects_unreachable_tasks_up_front() -> TestResult {
    init_tracing();

    let work = ScriptedWork::succeeding(0);
    let tasks = vec![
        TaskDefinition::new("fine", work.clone()),
        TaskDefinition::builder("orphan", work.clone()).after("ghost").build(),
    ];

    let options = EngineOptions {
        strict_graph: true,
        ..fast_options()
    };
    let err = Engine::new(options)
        .run(tasks)
        .await
        .expect_err("strict mode must reject unknown dependencies");

    match err {
        DagflowError::UnreachableTasks(msg) => {
            assert!(msg.contains("ghost"), "message: {msg}");
            assert!(msg.contains("orphan"), "message: {msg}");
        }
        other => panic!("expected UnreachableTasks, got {other:?}"),
    }
    assert_eq!(work.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn strict_graph_accepts_well_formed_graphs() -> TestResult {
    init_tracing();

    let options = EngineOptions {
        strict_graph: true,
        ..fast_options()
    };
    let tasks = vec![ok_task("a", 1).build(), ok_task("b", 2).after("a").build()];
    let result = Engine::new(options).run(tasks).await?;

    assert!(result.is_success());
    Ok(())
}
