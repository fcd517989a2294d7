// src/dag/task_info.rs

//! Per-task execution records.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use crate::engine::TaskName;
use crate::errors::TaskFailure;
use crate::task::TaskValue;
use crate::types::ExecutionMode;

/// Execution state of a task within a run.
///
/// `Pending -> Running -> {Completed | Failed}`, plus `Pending -> Failed`
/// when a dependency fails. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    /// Whether `self -> next` is a forward move of the state machine.
    pub fn can_transition_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Pending, TaskState::Running)
                | (TaskState::Pending, TaskState::Failed)
                | (TaskState::Running, TaskState::Completed)
                | (TaskState::Running, TaskState::Failed)
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Pending => "PENDING",
            TaskState::Running => "RUNNING",
            TaskState::Completed => "COMPLETED",
            TaskState::Failed => "FAILED",
        };
        f.pad(s)
    }
}

/// Outcome of one fan-out instance, stored at its index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceOutcome {
    pub index: usize,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskValue>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "crate::engine::result::serialize_failure"
    )]
    pub failure: Option<TaskFailure>,
}

impl InstanceOutcome {
    pub fn from_result(index: usize, attempts: u32, result: Result<TaskValue, TaskFailure>) -> Self {
        match result {
            Ok(value) => Self {
                index,
                attempts,
                result: Some(value),
                failure: None,
            },
            Err(failure) => Self {
                index,
                attempts,
                result: None,
                failure: Some(failure),
            },
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// Mutable record tracking one task across a run.
///
/// Only the scheduler mutates it: executors report an outcome, and the
/// scheduler applies it.
#[derive(Debug, Clone)]
pub struct TaskRun {
    pub id: TaskName,
    pub mode: ExecutionMode,
    pub state: TaskState,
    /// Attempts made. For fan-out tasks, the sum over all instances.
    pub attempts: u32,
    /// Present only when `state == Completed`.
    pub result: Option<TaskValue>,
    /// Present only when `state == Failed`.
    pub failure: Option<TaskFailure>,
    /// Always 1 for non-fan-out tasks.
    pub instance_count: usize,
    pub instances: Vec<InstanceOutcome>,
    /// Wall time of the dispatch, once it has finished.
    pub elapsed: Option<Duration>,
}

impl TaskRun {
    pub fn new(id: TaskName, mode: ExecutionMode, instance_count: usize) -> Self {
        Self {
            id,
            mode,
            state: TaskState::Pending,
            attempts: 0,
            result: None,
            failure: None,
            instance_count,
            instances: Vec::new(),
            elapsed: None,
        }
    }

    /// Move to `next` if that is a forward transition.
    ///
    /// Returns `false` (and leaves the state untouched) otherwise.
    pub fn transition(&mut self, next: TaskState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            warn!(
                task = %self.id,
                from = ?self.state,
                to = ?next,
                "ignoring non-forward state transition"
            );
            false
        }
    }

    pub fn complete(&mut self, value: TaskValue) -> bool {
        if self.transition(TaskState::Completed) {
            self.result = Some(value);
            self.failure = None;
            true
        } else {
            false
        }
    }

    pub fn fail(&mut self, failure: TaskFailure) -> bool {
        if self.transition(TaskState::Failed) {
            self.failure = Some(failure);
            self.result = None;
            true
        } else {
            false
        }
    }
}
