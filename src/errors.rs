// src/errors.rs

//! Crate-wide error types.
//!
//! - [`DagflowError`] is the only error a run can *raise*. It is fatal and is
//!   returned before any unit of work executes.
//! - [`TaskFailure`] describes why a single task ended up `Failed`. It is
//!   recorded in the run result and never propagated as an engine error.

use std::time::Duration;

use thiserror::Error;

use crate::engine::TaskName;

#[derive(Error, Debug)]
pub enum DagflowError {
    #[error("Duplicate task id: {0}")]
    DuplicateTaskId(TaskName),

    #[error("Unreachable tasks in graph: {0}")]
    UnreachableTasks(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DagflowError>;

/// Failure of one fan-out instance, kept at its instance index.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceFailure {
    pub index: usize,
    pub failure: TaskFailure,
}

/// Why a task (or a fan-out instance) ended up `Failed`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskFailure {
    /// The unit of work returned an error.
    #[error("{0}")]
    Work(String),

    #[error("Task timed out after {0:?}")]
    TimedOut(Duration),

    /// A dependency failed, so the task was never attempted.
    #[error("Dependency failed for task {task}")]
    DependencyFailed { task: TaskName, dependency: TaskName },

    #[error("{} of {total} fan-out instances failed: {}", failures.len(), join_instance_failures(failures))]
    FanoutFailed {
        total: usize,
        failures: Vec<InstanceFailure>,
    },

    /// The unit of work panicked or its tokio task could not be joined.
    #[error("Task execution aborted: {0}")]
    Aborted(String),
}

impl TaskFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskFailure::TimedOut(_))
    }

    pub fn is_dependency_failure(&self) -> bool {
        matches!(self, TaskFailure::DependencyFailed { .. })
    }
}

fn join_instance_failures(failures: &[InstanceFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("[{}] {}", f.index, f.failure))
        .collect::<Vec<_>>()
        .join("; ")
}
