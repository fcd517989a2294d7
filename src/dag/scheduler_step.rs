// src/dag/scheduler_step.rs

//! Result type of one readiness iteration.

use crate::engine::TaskName;
use crate::errors::TaskFailure;

/// What one iteration of the scheduling loop decided.
///
/// Every task listed in `sequential` or `concurrent` has already been moved
/// to `Running`; every task in `newly_failed` has already been moved to
/// `Failed`.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// 1-based iteration number.
    pub iteration: u64,
    /// Ready `Sequential` tasks, in input order.
    pub sequential: Vec<TaskName>,
    /// Ready `Parallel` and `Fanout` tasks. Dispatch order carries no meaning.
    pub concurrent: Vec<TaskName>,
    /// Tasks failed in this iteration because a dependency failed.
    pub newly_failed: Vec<(TaskName, TaskFailure)>,
}

impl SchedulerStep {
    /// Whether this iteration changed anything. When it did not, the loop has
    /// reached its fixed point.
    pub fn made_progress(&self) -> bool {
        !(self.sequential.is_empty() && self.concurrent.is_empty() && self.newly_failed.is_empty())
    }

    pub fn dispatched(&self) -> usize {
        self.sequential.len() + self.concurrent.len()
    }
}
