// src/engine/mod.rs

//! Orchestration engine for dagflow.
//!
//! This module ties together:
//! - the synchronous scheduler in [`crate::dag`]
//! - the executors in [`crate::exec`]
//! - observer notification ([`events`])
//! - the caller-visible result ([`result`])
//!
//! The async driver of the scheduling loop lives in [`runtime`].

use std::time::Duration;

use crate::dag::InstanceOutcome;
use crate::errors::TaskFailure;
use crate::task::TaskValue;

/// Canonical task id type used throughout the engine.
pub type TaskName = String;

/// What an executor reports back to the scheduler for one dispatch.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Attempts made; summed over instances for fan-out tasks.
    pub attempts: u32,
    pub result: Result<TaskValue, TaskFailure>,
    /// Per-instance outcomes; empty for non-fan-out tasks.
    pub instances: Vec<InstanceOutcome>,
    pub elapsed: Duration,
}

impl ExecutionOutcome {
    /// Outcome for a dispatch whose executor could not be joined.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self {
            attempts: 0,
            result: Err(TaskFailure::Aborted(reason.into())),
            instances: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Engine-wide knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Instances per fan-out task in a run.
    pub fanout_instances: usize,
    /// Delay before attempt `n + 1` is `backoff_step * n`.
    pub backoff_step: Duration,
    /// Log a warning when a task takes longer than this.
    pub slow_task_threshold: Option<Duration>,
    /// Refuse graphs with cycles or unknown dependencies instead of leaving
    /// the affected tasks `Pending`.
    pub strict_graph: bool,
}

pub const DEFAULT_BACKOFF_STEP: Duration = Duration::from_millis(50);
pub const DEFAULT_SLOW_TASK_THRESHOLD: Duration = Duration::from_millis(5000);

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            fanout_instances: 1,
            backoff_step: DEFAULT_BACKOFF_STEP,
            slow_task_threshold: Some(DEFAULT_SLOW_TASK_THRESHOLD),
            strict_graph: false,
        }
    }
}

pub mod events;
pub mod result;
pub mod runtime;

pub use events::{ChannelSink, EventEmitter, EventKind, EventSink, WorkflowEvent};
pub use result::{RunResult, TaskReport};
pub use runtime::Engine;
