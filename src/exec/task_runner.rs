// src/exec/task_runner.rs

//! Runs one dispatched task to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::engine::{EventEmitter, EventKind, ExecutionOutcome};
use crate::exec::attempt::{AttemptScope, RetryPolicy, run_with_retries};
use crate::exec::fanout::run_fanout;
use crate::task::TaskDefinition;
use crate::types::ExecutionMode;

/// Settings shared by every dispatch of a run.
#[derive(Debug, Clone)]
pub struct ExecContext {
    pub events: EventEmitter,
    pub backoff_step: Duration,
    pub slow_task_threshold: Option<Duration>,
}

/// Whether a dispatch goes through the fan-out coordinator. A fan-out task
/// with a single instance runs like any other task.
pub fn uses_fanout(def: &TaskDefinition, instances: usize) -> bool {
    def.mode == ExecutionMode::Fanout && instances > 1
}

/// Message attached to the `TaskStarted` event of a dispatch.
pub fn start_message(def: &TaskDefinition, instances: usize) -> Option<String> {
    uses_fanout(def, instances).then(|| format!("fanout instances={instances}"))
}

/// Emit `TaskStarted` for a dispatch. The scheduling loop calls this itself,
/// right before dispatching, so start events follow dispatch order.
pub fn announce_start(def: &TaskDefinition, instances: usize, ctx: &ExecContext) {
    ctx.events
        .emit(EventKind::TaskStarted, &def.id, start_message(def, instances));
}

/// Execute a task that has just been moved to `Running`.
///
/// Fan-out tasks with more than one instance go through the fan-out
/// coordinator; every other task runs the attempt protocol once and keeps
/// its plain result.
pub async fn run_task(def: Arc<TaskDefinition>, instances: usize, ctx: ExecContext) -> ExecutionOutcome {
    let started = Instant::now();
    debug!(task = %def.id, mode = %def.mode, instances, "executing task");

    let mut outcome = if uses_fanout(&def, instances) {
        let fanout =
            run_fanout(Arc::clone(&def), instances, ctx.backoff_step, ctx.events.clone()).await;
        ExecutionOutcome {
            attempts: fanout.attempts,
            result: fanout.result,
            instances: fanout.instances,
            elapsed: Duration::ZERO,
        }
    } else {
        let policy = RetryPolicy::for_task(&def, ctx.backoff_step);
        let attempts =
            run_with_retries(&def.id, &def.work, policy, AttemptScope::Task, &ctx.events).await;
        ExecutionOutcome {
            attempts: attempts.attempts,
            result: attempts.result,
            instances: Vec::new(),
            elapsed: Duration::ZERO,
        }
    };

    outcome.elapsed = started.elapsed();

    if let Some(threshold) = ctx.slow_task_threshold {
        if outcome.elapsed > threshold {
            warn!(
                task = %def.id,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                threshold_ms = threshold.as_millis() as u64,
                "slow task: execution exceeded warning threshold"
            );
        }
    }

    outcome
}
