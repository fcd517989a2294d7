// src/dag/scheduler.rs

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::dag::graph::DagGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, Readiness, StateManager};
use crate::dag::task_info::{TaskRun, TaskState};
use crate::dag::validate::build_task_runs;
use crate::engine::result::RunResult;
use crate::engine::{ExecutionOutcome, TaskName};
use crate::errors::Result;
use crate::task::TaskDefinition;

/// Scheduler holds the dependency graph plus the mutable per-task records.
///
/// It is the synchronous half of the scheduling loop and is responsible for:
/// - deciding which pending tasks are ready, blocked, or still waiting
/// - failing blocked tasks with a dependency failure
/// - moving ready tasks to `Running` and partitioning them by mode
/// - applying the outcome reported by an executor
///
/// It never runs anything itself; `engine::Engine` drives it.
#[derive(Debug)]
pub struct Scheduler {
    graph: DagGraph,
    runs: IndexMap<TaskName, TaskRun>,
    iteration: u64,
}

impl Scheduler {
    /// Validate the definitions and create one `Pending` record per task.
    pub fn new(defs: &[TaskDefinition], fanout_instances: usize) -> Result<Self> {
        let runs = build_task_runs(defs, fanout_instances)?;
        let graph = DagGraph::from_definitions(defs);

        Ok(Self {
            graph,
            runs,
            iteration: 0,
        })
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    /// Number of iterations run so far.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn run_state_of(&self, task: &str) -> Option<TaskState> {
        self.runs.get(task).map(|run| run.state)
    }

    pub fn task_run(&self, task: &str) -> Option<&TaskRun> {
        self.runs.get(task)
    }

    /// Fan-out instance count of a task (1 unless it is a fan-out task).
    pub fn instance_count_of(&self, task: &str) -> usize {
        self.runs.get(task).map(|run| run.instance_count).unwrap_or(1)
    }

    /// Readiness of a task that is still `Pending`.
    pub fn readiness_of(&self, task: &str) -> Option<Readiness> {
        let run = self.runs.get(task)?;
        if run.state != TaskState::Pending {
            return None;
        }
        Some(ReadOnlyStateManager::new(&self.graph, &self.runs).readiness_of(task))
    }

    /// Whether every task reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.runs.values().all(|run| run.state.is_terminal())
    }

    /// Ids of tasks still `Pending`, in input order.
    pub fn pending_tasks(&self) -> Vec<TaskName> {
        self.runs
            .values()
            .filter(|run| run.state == TaskState::Pending)
            .map(|run| run.id.clone())
            .collect()
    }

    /// Run one readiness iteration.
    ///
    /// Blocked tasks are failed on the spot. Ready tasks are marked `Running`
    /// and returned, split into sequential (input order preserved) and
    /// concurrent ones. A step with no progress means the loop is done.
    pub fn step(&mut self) -> SchedulerStep {
        self.iteration += 1;
        let mut step = SchedulerStep {
            iteration: self.iteration,
            ..SchedulerStep::default()
        };

        let mut ready = Vec::new();
        {
            let mut manager = StateManager::new(&self.graph, &mut self.runs);

            // Decide first, then mutate.
            for (task, readiness) in manager.scan() {
                match readiness {
                    Readiness::Blocked { dependency } => {
                        if let Some(failure) = manager.mark_blocked(&task, &dependency) {
                            step.newly_failed.push((task, failure));
                        }
                    }
                    Readiness::Ready => {
                        if manager.mark_running(&task) {
                            ready.push(task);
                        }
                    }
                    Readiness::Waiting => {}
                }
            }
        }

        for task in ready {
            let concurrent = self
                .runs
                .get(&task)
                .is_some_and(|run| run.mode.is_concurrent());
            if concurrent {
                step.concurrent.push(task);
            } else {
                step.sequential.push(task);
            }
        }

        if step.made_progress() {
            info!(
                iteration = step.iteration,
                sequential = ?step.sequential,
                concurrent = ?step.concurrent,
                dependency_failed = step.newly_failed.len(),
                "scheduler: dispatching ready tasks"
            );
        } else {
            let pending = self.pending_tasks();
            if pending.is_empty() {
                debug!(iteration = step.iteration, "scheduler: all tasks terminal");
            } else {
                warn!(
                    iteration = step.iteration,
                    ?pending,
                    "scheduler: no progress possible; remaining tasks stay Pending"
                );
            }
        }

        step
    }

    /// Record the outcome of a dispatched task.
    pub fn complete(&mut self, task: &str, outcome: ExecutionOutcome) {
        let Some(run) = self.runs.get_mut(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return;
        };
        if run.state != TaskState::Running {
            warn!(task = %task, state = ?run.state, "completion for task that is not running; ignoring");
            return;
        }

        run.attempts = outcome.attempts;
        run.instances = outcome.instances;
        run.elapsed = Some(outcome.elapsed);

        match outcome.result {
            Ok(value) => {
                if run.complete(value) {
                    debug!(task = %task, attempts = run.attempts, "task completed");
                }
            }
            Err(failure) => {
                if run.fail(failure) {
                    debug!(task = %task, attempts = run.attempts, "task failed");
                }
            }
        }
    }

    /// Freeze the records into the caller-visible result.
    pub fn into_result(self, elapsed: std::time::Duration) -> RunResult {
        RunResult::from_runs(self.runs, elapsed)
    }
}
