// src/exec/fanout.rs

//! Fan-out coordinator: one logical task, N independent instances.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::dag::InstanceOutcome;
use crate::engine::{EventEmitter, EventKind};
use crate::errors::{InstanceFailure, TaskFailure};
use crate::exec::attempt::{AttemptScope, RetryPolicy, run_with_retries};
use crate::exec::limiter::ConcurrencyLimiter;
use crate::task::{TaskDefinition, TaskValue};

/// Aggregate of all instances of one fan-out dispatch.
#[derive(Debug, Clone)]
pub struct FanoutOutcome {
    /// Attempts summed over all instances.
    pub attempts: u32,
    pub result: Result<TaskValue, TaskFailure>,
    /// One entry per instance, at its index.
    pub instances: Vec<InstanceOutcome>,
}

/// Effective admission cap: the task's `fanout_max_concurrency`, or the
/// instance count when unset or zero.
pub fn effective_concurrency(def: &TaskDefinition, instances: usize) -> usize {
    def.fanout_max_concurrency
        .filter(|cap| *cap > 0)
        .unwrap_or(instances)
        .max(1)
}

/// Run `instances` copies of the task's work through a limiter.
///
/// Each instance has its own attempt counter and runs the full retry
/// protocol. The task completes with a JSON array of instance results
/// (instance `i` at position `i`) only if every instance completes;
/// otherwise it fails with every instance failure attached.
pub async fn run_fanout(
    def: Arc<TaskDefinition>,
    instances: usize,
    backoff_step: Duration,
    events: EventEmitter,
) -> FanoutOutcome {
    let instances = instances.max(1);
    let capacity = effective_concurrency(&def, instances);
    let limiter = ConcurrencyLimiter::new(capacity);
    let policy = RetryPolicy::for_task(&def, backoff_step);

    info!(task = %def.id, instances, capacity, "fan-out: dispatching instances");

    let mut handles = Vec::with_capacity(instances);
    for index in 0..instances {
        let def = Arc::clone(&def);
        let limiter = limiter.clone();
        let events = events.clone();

        handles.push(tokio::spawn(async move {
            let _permit = limiter.acquire().await;
            debug!(task = %def.id, instance = index, in_use = limiter.in_use(), "instance admitted");

            let outcome = run_with_retries(
                &def.id,
                &def.work,
                policy,
                AttemptScope::Instance(index),
                &events,
            )
            .await;
            InstanceOutcome::from_result(index, outcome.attempts, outcome.result)
        }));
    }

    // Awaiting in spawn order keeps instance i at position i.
    let mut outcomes = Vec::with_capacity(instances);
    for (index, handle) in handles.into_iter().enumerate() {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join_err) => InstanceOutcome::from_result(
                index,
                0,
                Err(TaskFailure::Aborted(join_err.to_string())),
            ),
        };
        outcomes.push(outcome);
    }

    let attempts: u32 = outcomes.iter().map(|o| o.attempts).sum();
    let failures: Vec<InstanceFailure> = outcomes
        .iter()
        .filter_map(|o| {
            o.failure.clone().map(|failure| InstanceFailure {
                index: o.index,
                failure,
            })
        })
        .collect();

    let result = if failures.is_empty() {
        let values = outcomes
            .iter()
            .map(|o| o.result.clone().unwrap_or(TaskValue::Null))
            .collect();
        events.emit(
            EventKind::TaskCompleted,
            &def.id,
            Some(format!("fanout completed instances={instances}")),
        );
        Ok(TaskValue::Array(values))
    } else {
        events.emit(
            EventKind::TaskFailed,
            &def.id,
            Some(format!(
                "fanout failed instances={instances} failed={}",
                failures.len()
            )),
        );
        Err(TaskFailure::FanoutFailed {
            total: instances,
            failures,
        })
    };

    FanoutOutcome {
        attempts,
        result,
        instances: outcomes,
    }
}
