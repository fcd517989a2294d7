// src/dag/state_manager.rs

//! Readiness detection and the state transitions the scheduler drives
//! directly (dispatch and dependency-propagated failure).

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::dag::DagGraph;
use crate::dag::task_info::{TaskRun, TaskState};
use crate::engine::TaskName;
use crate::errors::TaskFailure;

/// Readiness of a `Pending` task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Every dependency is `Completed`.
    Ready,
    /// At least one dependency is `Failed`; `dependency` is the first one in
    /// declaration order.
    Blocked { dependency: TaskName },
    /// Some dependency is still pending, running, or unknown.
    Waiting,
}

/// Mutable view over the run records used by the scheduler.
pub struct StateManager<'a> {
    graph: &'a DagGraph,
    runs: &'a mut IndexMap<TaskName, TaskRun>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a DagGraph, runs: &'a mut IndexMap<TaskName, TaskRun>) -> Self {
        Self { graph, runs }
    }

    /// Readiness of every `Pending` task, in input order.
    pub fn scan(&self) -> Vec<(TaskName, Readiness)> {
        let ro = ReadOnlyStateManager::new(self.graph, &*self.runs);
        self.runs
            .values()
            .filter(|run| run.state == TaskState::Pending)
            .map(|run| (run.id.clone(), ro.readiness_of(&run.id)))
            .collect()
    }

    /// Fail a pending task because `dependency` failed. The task is never
    /// attempted and no retry is consumed.
    pub fn mark_blocked(&mut self, task: &str, dependency: &str) -> Option<TaskFailure> {
        let run = self.runs.get_mut(task)?;
        let failure = TaskFailure::DependencyFailed {
            task: task.to_string(),
            dependency: dependency.to_string(),
        };
        if run.fail(failure.clone()) {
            debug!(
                task = %task,
                dependency = %dependency,
                "dependency failed; marking task Failed without running it"
            );
            Some(failure)
        } else {
            None
        }
    }

    /// Mark a ready task as dispatched.
    pub fn mark_running(&mut self, task: &str) -> bool {
        match self.runs.get_mut(task) {
            Some(run) => run.transition(TaskState::Running),
            None => false,
        }
    }
}

/// Read-only readiness checks.
pub struct ReadOnlyStateManager<'a> {
    graph: &'a DagGraph,
    runs: &'a IndexMap<TaskName, TaskRun>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(graph: &'a DagGraph, runs: &'a IndexMap<TaskName, TaskRun>) -> Self {
        Self { graph, runs }
    }

    /// Failure of a dependency wins over readiness: a task with one failed
    /// and one pending dependency is `Blocked`, not `Waiting`.
    pub fn readiness_of(&self, task: &str) -> Readiness {
        let deps = self.graph.dependencies_of(task);

        let failed = deps.iter().find(|dep| {
            self.runs
                .get(dep.as_str())
                .is_some_and(|run| run.state == TaskState::Failed)
        });
        if let Some(dep) = failed {
            return Readiness::Blocked {
                dependency: dep.clone(),
            };
        }

        for dep in deps {
            match self.runs.get(dep.as_str()).map(|run| run.state) {
                Some(TaskState::Completed) => {}
                Some(_) => return Readiness::Waiting,
                None => {
                    trace!(task = %task, dep = %dep, "dependency is not part of the graph");
                    return Readiness::Waiting;
                }
            }
        }

        Readiness::Ready
    }
}
