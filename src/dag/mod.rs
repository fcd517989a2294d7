// src/dag/mod.rs

//! Task graph representation and the synchronous half of scheduling.
//!
//! - [`graph`] holds the dependency graph and its diagnostics.
//! - [`validate`] turns definitions into per-task run records.
//! - [`task_info`] provides the task state machine and run records.
//! - [`state_manager`] decides readiness and applies dispatch/blocked
//!   transitions.
//! - [`scheduler`] runs one readiness iteration at a time.
//! - [`scheduler_step`] defines the result type for an iteration.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;
pub mod validate;

pub use graph::{DagGraph, GraphDiagnostics};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use state_manager::Readiness;
pub use task_info::{InstanceOutcome, TaskRun, TaskState};
pub use validate::build_task_runs;
