#![cfg(unix)]

mod common;

use std::io::Write;

use dagflow::cli::CliArgs;
use dagflow::config::load_and_validate;
use dagflow::dag::TaskState;
use dagflow::engine::Engine;
use dagflow::errors::TaskFailure;
use dagflow::exec::CommandWork;
use dagflow::task::{TaskDefinition, Work};
use serde_json::json;
use tempfile::NamedTempFile;

use common::{TestResult, fast_options, init_tracing, with_timeout};

#[tokio::test]
async fn command_stdout_becomes_the_task_result() -> TestResult {
    init_tracing();

    let work = CommandWork::new("hello", "echo '  hello world  '");
    let value = work.call().await?;

    assert_eq!(value, json!("hello world"));
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_reports_code_and_stderr() -> TestResult {
    init_tracing();

    let work = CommandWork::new("broken", "echo oops >&2; exit 3");
    let err = work.call().await.expect_err("exit 3 must fail");

    assert_eq!(err.message(), "command exited with code 3: oops");
    Ok(())
}

#[tokio::test]
async fn timed_out_command_fails_the_task() -> TestResult {
    init_tracing();

    let tasks = vec![
        TaskDefinition::builder("sleepy", CommandWork::new("sleepy", "sleep 5"))
            .timeout_ms(50)
            .build(),
    ];

    let result = with_timeout(Engine::new(fast_options()).run(tasks)).await?;

    assert_eq!(result.state_of("sleepy"), Some(TaskState::Failed));
    assert!(matches!(
        result.get("sleepy").and_then(|r| r.failure.clone()),
        Some(TaskFailure::TimedOut(_))
    ));
    Ok(())
}

#[tokio::test]
async fn workflow_file_runs_end_to_end() -> TestResult {
    init_tracing();

    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[engine]
fanout_instances = 3

[[task]]
id = "greet"
cmd = "printf hi"

[[task]]
id = "shout"
cmd = "printf HI"
mode = "fanout"
max_concurrency = 2
dependencies = ["greet"]

[[task]]
id = "fail"
cmd = "exit 1"
retries = 1

[[task]]
id = "never"
cmd = "printf never"
dependencies = ["fail"]
"#
    )?;

    let cfg = load_and_validate(file.path())?;
    let result = with_timeout(Engine::new(cfg.options()).run(cfg.definitions())).await?;

    assert_eq!(result.get("greet").and_then(|r| r.result.clone()), Some(json!("hi")));
    assert_eq!(
        result.get("shout").and_then(|r| r.result.clone()),
        Some(json!(["HI", "HI", "HI"]))
    );
    assert_eq!(result.get("fail").map(|r| r.attempts), Some(2));
    assert_eq!(result.state_of("never"), Some(TaskState::Failed));
    Ok(())
}

fn cli_args(workflow: &str) -> CliArgs {
    CliArgs {
        workflow: workflow.into(),
        fanout_instances: None,
        log_level: None,
        dry_run: false,
        events: false,
        json: false,
    }
}

#[tokio::test]
async fn cli_run_reports_failed_workflows_as_errors() -> TestResult {
    init_tracing();

    let mut ok_file = NamedTempFile::new()?;
    write!(ok_file, "[[task]]\nid = \"a\"\ncmd = \"true\"\n")?;
    let mut bad_file = NamedTempFile::new()?;
    write!(bad_file, "[[task]]\nid = \"a\"\ncmd = \"false\"\n")?;

    let ok_path = ok_file.path().to_string_lossy().to_string();
    let bad_path = bad_file.path().to_string_lossy().to_string();

    dagflow::run(cli_args(&ok_path)).await?;

    let err = dagflow::run(cli_args(&bad_path))
        .await
        .expect_err("failed task must fail the run");
    assert!(err.to_string().contains("1 failed"), "error: {err}");

    let dry_run = CliArgs {
        dry_run: true,
        ..cli_args(&bad_path)
    };
    dagflow::run(dry_run).await?;
    Ok(())
}
