mod common;

use dagflow::engine::Engine;

use common::{TestResult, failing_task, fast_options, init_tracing, ok_task};

#[tokio::test]
async fn response_json_has_envelope_and_per_task_data() -> TestResult {
    init_tracing();

    let tasks = vec![
        ok_task("good", 42).build(),
        failing_task("bad", "nope").build(),
        ok_task("blocked", 0).after("bad").build(),
        ok_task("stuck", 0).after("missing").build(),
    ];
    let result = Engine::new(fast_options()).run(tasks).await?;
    let doc = result.to_response_json()?;

    assert_eq!(doc["success"], false);
    assert!(doc["timestamp"].is_string());
    assert_eq!(doc["metadata"]["task_count"], 4);
    assert!(doc["metadata"]["execution_time_ms"].is_u64());

    let data = &doc["data"];
    assert_eq!(data["good"]["state"], "COMPLETED");
    assert_eq!(data["good"]["result"], 42);
    assert_eq!(data["good"]["attempts"], 1);
    assert!(data["good"].get("error").is_none());

    assert_eq!(data["bad"]["state"], "FAILED");
    assert_eq!(data["bad"]["error"], "nope");
    assert!(data["bad"].get("result").is_none());

    assert_eq!(data["blocked"]["error"], "Dependency failed for task blocked");
    assert_eq!(data["stuck"]["state"], "PENDING");
    Ok(())
}

#[tokio::test]
async fn state_partitions_cover_every_task() -> TestResult {
    init_tracing();

    let tasks = vec![
        ok_task("a", 1).build(),
        failing_task("b", "x").build(),
        ok_task("c", 1).after("nowhere").build(),
    ];
    let result = Engine::new(fast_options()).run(tasks).await?;

    assert_eq!(result.completed(), vec!["a"]);
    assert_eq!(result.failed(), vec!["b"]);
    assert_eq!(result.pending(), vec!["c"]);
    assert!(!result.is_success());
    Ok(())
}
