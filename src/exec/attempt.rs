// src/exec/attempt.rs

//! Per-attempt protocol: timeout race, retry, and linear backoff.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::{EventEmitter, EventKind};
use crate::errors::TaskFailure;
use crate::task::{TaskDefinition, TaskValue, Work};

/// Retry and timeout policy for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub timeout: Option<Duration>,
    pub backoff_step: Duration,
}

impl RetryPolicy {
    pub fn for_task(def: &TaskDefinition, backoff_step: Duration) -> Self {
        Self {
            max_retries: def.max_retries,
            timeout: def.timeout,
            backoff_step,
        }
    }

    /// Delay after the `attempts`-th failed attempt: `backoff_step * attempts`.
    ///
    /// Deterministic, no jitter, strictly increasing with `attempts`.
    pub fn backoff_delay(&self, attempts: u32) -> Duration {
        self.backoff_step.saturating_mul(attempts)
    }

    /// Whether another attempt is allowed after `attempts` failed ones.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts.saturating_sub(1) < self.max_retries
    }
}

/// Who the attempts are made for; only changes event wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptScope {
    /// A whole, non-fan-out task.
    Task,
    /// One fan-out instance, by index.
    Instance(usize),
}

/// Result of running the attempt loop to its end.
#[derive(Debug, Clone)]
pub struct AttemptsOutcome {
    pub attempts: u32,
    pub result: Result<TaskValue, TaskFailure>,
}

/// Run attempts until one succeeds or retries are exhausted.
///
/// Every failed attempt emits `TaskFailed`; every retry additionally emits
/// `TaskRetried` and then sleeps for the backoff delay. A successful task
/// attempt emits `TaskCompleted`; a successful instance attempt emits
/// nothing, since the fan-out coordinator reports the aggregate.
pub async fn run_with_retries(
    task_id: &str,
    work: &Arc<dyn Work>,
    policy: RetryPolicy,
    scope: AttemptScope,
    events: &EventEmitter,
) -> AttemptsOutcome {
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        debug!(task = %task_id, attempt = attempts, ?scope, "starting attempt");

        match run_attempt(work, policy.timeout).await {
            Ok(value) => {
                match scope {
                    AttemptScope::Task => {
                        events.emit(
                            EventKind::TaskCompleted,
                            task_id,
                            Some(format!("attempt={attempts}")),
                        );
                    }
                    AttemptScope::Instance(index) => {
                        debug!(task = %task_id, instance = index, attempt = attempts, "instance completed");
                    }
                }
                return AttemptsOutcome {
                    attempts,
                    result: Ok(value),
                };
            }
            Err(failure) => {
                let message = match scope {
                    AttemptScope::Task => format!("attempt={attempts} error={failure}"),
                    AttemptScope::Instance(index) => {
                        format!("instance={index} attempt={attempts} error={failure}")
                    }
                };
                events.emit(EventKind::TaskFailed, task_id, Some(message));

                if !policy.should_retry(attempts) {
                    warn!(
                        task = %task_id,
                        ?scope,
                        attempts,
                        error = %failure,
                        "attempt failed; retries exhausted"
                    );
                    return AttemptsOutcome {
                        attempts,
                        result: Err(failure),
                    };
                }

                let message = match scope {
                    AttemptScope::Task => format!("retrying attempt={attempts}"),
                    AttemptScope::Instance(index) => {
                        format!("fanout instance={index} attempt={attempts}")
                    }
                };
                events.emit(EventKind::TaskRetried, task_id, Some(message));

                let delay = policy.backoff_delay(attempts);
                debug!(
                    task = %task_id,
                    ?scope,
                    attempt = attempts,
                    ?delay,
                    error = %failure,
                    "attempt failed; backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Run one attempt, racing it against `timeout` when set.
///
/// The unit of work is spawned. When the timer wins, the join handle is
/// dropped: the work is detached and keeps running until it finishes on its
/// own, but its result is discarded. The runtime cannot preempt it.
pub async fn run_attempt(
    work: &Arc<dyn Work>,
    timeout: Option<Duration>,
) -> Result<TaskValue, TaskFailure> {
    let work = Arc::clone(work);
    let handle = tokio::spawn(async move { work.call().await });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_) => return Err(TaskFailure::TimedOut(limit)),
        },
        None => handle.await,
    };

    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(TaskFailure::Work(err.to_string())),
        Err(join_err) => Err(TaskFailure::Aborted(join_err.to_string())),
    }
}
