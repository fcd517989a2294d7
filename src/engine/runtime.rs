// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::dag::Scheduler;
use crate::errors::{DagflowError, Result};
use crate::exec::task_runner::{ExecContext, announce_start, run_task};
use crate::task::TaskDefinition;

use super::events::{EventEmitter, EventKind, EventSink};
use super::result::RunResult;
use super::{EngineOptions, ExecutionOutcome, TaskName};

/// In-process task orchestrator.
///
/// Drives the synchronous [`Scheduler`] to a fixed point and hands the ready
/// tasks of every iteration to the executors:
/// - `Parallel` and `Fanout` tasks are spawned first, all at once;
/// - `Sequential` tasks then run one at a time, in input order;
/// - the iteration ends once everything it dispatched has finished.
///
/// Observers are registered with [`Engine::register`] before a run and are
/// notified synchronously during it, never after it returns.
pub struct Engine {
    options: EngineOptions,
    observers: Vec<Arc<dyn EventSink>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineOptions::default())
    }
}

impl Engine {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            options,
            observers: Vec::new(),
        }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Register an observer for subsequent runs.
    pub fn register(&mut self, sink: Arc<dyn EventSink>) {
        self.observers.push(sink);
    }

    /// Run a task graph with the configured fan-out instance count.
    pub async fn run(&self, tasks: Vec<TaskDefinition>) -> Result<RunResult> {
        self.run_with_fanout(tasks, self.options.fanout_instances).await
    }

    /// Run a task graph, expanding every fan-out task into
    /// `fanout_instances` instances.
    ///
    /// The only error is a fatal one raised before anything runs (duplicate
    /// ids, or an unreachable graph in strict mode). Task failures are
    /// reported in the returned [`RunResult`].
    pub async fn run_with_fanout(
        &self,
        tasks: Vec<TaskDefinition>,
        fanout_instances: usize,
    ) -> Result<RunResult> {
        let started = Instant::now();

        if fanout_instances == 0 {
            warn!("fan-out instance count of 0 requested; using 1");
        }
        let fanout_instances = fanout_instances.max(1);

        let mut scheduler = Scheduler::new(&tasks, fanout_instances)?;

        let diagnostics = scheduler.graph().diagnostics();
        if !diagnostics.is_clean() {
            if self.options.strict_graph {
                return Err(DagflowError::UnreachableTasks(diagnostics.describe()));
            }
            warn!(
                unreachable = ?diagnostics.unreachable,
                "task graph has unknown dependencies or cycles; affected tasks will stay Pending: {}",
                diagnostics.describe()
            );
        }

        let definitions: HashMap<TaskName, Arc<TaskDefinition>> = tasks
            .into_iter()
            .map(|def| (def.id.clone(), Arc::new(def)))
            .collect();

        let ctx = ExecContext {
            events: EventEmitter::new(self.observers.clone()),
            backoff_step: self.options.backoff_step,
            slow_task_threshold: self.options.slow_task_threshold,
        };

        info!(
            tasks = definitions.len(),
            fanout_instances,
            "engine: run started"
        );

        loop {
            let step = scheduler.step();

            for (task, _failure) in &step.newly_failed {
                ctx.events.emit(
                    EventKind::TaskFailed,
                    task,
                    Some("dependency failed".to_string()),
                );
            }

            if !step.made_progress() {
                break;
            }

            // Concurrent tasks are all dispatched before the first
            // sequential task starts.
            let mut handles = Vec::with_capacity(step.concurrent.len());
            for task in &step.concurrent {
                let Some(def) = definitions.get(task) else {
                    warn!(task = %task, "ready task has no definition; skipping");
                    continue;
                };
                let instances = scheduler.instance_count_of(task);
                announce_start(def, instances, &ctx);
                let handle = tokio::spawn(run_task(Arc::clone(def), instances, ctx.clone()));
                handles.push((task.clone(), handle));
            }

            for task in &step.sequential {
                let Some(def) = definitions.get(task) else {
                    warn!(task = %task, "ready task has no definition; skipping");
                    continue;
                };
                let instances = scheduler.instance_count_of(task);
                announce_start(def, instances, &ctx);
                let outcome = run_task(Arc::clone(def), instances, ctx.clone()).await;
                scheduler.complete(task, outcome);
            }

            for (task, handle) in handles {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(join_err) => {
                        warn!(task = %task, error = %join_err, "task executor aborted");
                        ExecutionOutcome::aborted(join_err.to_string())
                    }
                };
                scheduler.complete(&task, outcome);
            }

            debug!(iteration = step.iteration, dispatched = step.dispatched(), "engine: iteration finished");
        }

        ctx.events.close();

        let iterations = scheduler.iteration();
        let result = scheduler.into_result(started.elapsed());

        info!(
            iterations,
            completed = result.completed().len(),
            failed = result.failed().len(),
            pending = result.pending().len(),
            elapsed_ms = result.elapsed().as_millis() as u64,
            "engine: run finished"
        );

        Ok(result)
    }
}
