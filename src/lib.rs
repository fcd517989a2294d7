// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod task;
pub mod types;

use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::WorkflowFile;
use crate::dag::DagGraph;
use crate::engine::{ChannelSink, Engine, RunResult};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - workflow file loading
/// - the engine and its options
/// - the optional `--events` stream
/// - result reporting
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.workflow)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let mut options = cfg.options();
    if let Some(n) = args.fanout_instances {
        if n == 0 {
            bail!("--fanout-instances must be >= 1");
        }
        options.fanout_instances = n;
    }

    let definitions = cfg.definitions();
    info!(
        workflow = %args.workflow.display(),
        tasks = definitions.len(),
        fanout_instances = options.fanout_instances,
        "loaded workflow"
    );

    let mut engine = Engine::new(options);

    // Events are printed as JSON lines by a separate task so the engine
    // never waits on stdout.
    let printer = if args.events {
        let (sink, mut rx) = ChannelSink::channel();
        engine.register(Arc::new(sink));
        Some(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(err) => warn!(error = %err, "failed to serialise event"),
                }
            }
        }))
    } else {
        None
    };

    let result = engine.run(definitions).await;

    // Dropping the engine drops the last sender, which ends the printer.
    drop(engine);
    if let Some(printer) = printer {
        if let Err(err) = printer.await {
            warn!(error = %err, "event printer task failed");
        }
    }

    let result = result?;

    if args.json {
        let doc = result.to_response_json()?;
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print_summary(&result);
    }

    if !result.is_success() {
        bail!(
            "workflow did not complete: {} failed, {} pending",
            result.failed().len(),
            result.pending().len()
        );
    }

    Ok(())
}

/// Human readable per-task summary.
fn print_summary(result: &RunResult) {
    println!(
        "dagflow: {} tasks in {} ms",
        result.task_count(),
        result.elapsed().as_millis()
    );
    for (id, report) in result.iter() {
        print!("  {id:<24} {:<9} attempts={}", report.state, report.attempts);
        if let Some(err) = report.error_message() {
            print!("  error: {err}");
        }
        println!();
    }
}

/// Simple dry-run output: print tasks, deps, commands and graph problems.
fn print_dry_run(cfg: &WorkflowFile) {
    println!("dagflow dry-run");
    println!("  engine.fanout_instances = {}", cfg.engine.fanout_instances);
    println!("  engine.backoff_step_ms = {}", cfg.engine.backoff_step_ms);
    println!("  engine.strict_graph = {}", cfg.engine.strict_graph);
    println!();

    println!("tasks ({}):", cfg.task.len());
    for task in &cfg.task {
        println!("  - {}", task.id);
        println!("      cmd: {}", task.cmd);
        println!("      mode: {}", task.mode);
        if !task.dependencies.is_empty() {
            println!("      dependencies: {:?}", task.dependencies);
        }
        if task.retries > 0 {
            println!("      retries: {}", task.retries);
        }
        if let Some(ms) = task.timeout_ms {
            println!("      timeout_ms: {ms}");
        }
        if let Some(cap) = task.max_concurrency {
            println!("      max_concurrency: {cap}");
        }
    }

    let graph = DagGraph::from_definitions(&cfg.definitions());
    let diagnostics = graph.diagnostics();
    if !diagnostics.is_clean() {
        println!();
        println!("graph problems: {}", diagnostics.describe());
    }

    debug!("dry-run complete (no execution)");
}
