// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::engine::{DEFAULT_BACKOFF_STEP, DEFAULT_SLOW_TASK_THRESHOLD, EngineOptions};
use crate::exec::CommandWork;
use crate::task::TaskDefinition;
use crate::types::ExecutionMode;

/// Workflow file as read from TOML, before validation.
///
/// ```toml
/// [engine]
/// fanout_instances = 3
///
/// [[task]]
/// id = "fetch"
/// cmd = "curl -s https://example.com"
/// retries = 2
/// timeout_ms = 5000
/// mode = "parallel"
///
/// [[task]]
/// id = "process"
/// cmd = "./process.sh"
/// dependencies = ["fetch"]
/// ```
///
/// Tasks are an array of tables so that file order is input order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawWorkflowFile {
    /// Engine knobs from `[engine]`.
    #[serde(default)]
    pub engine: EngineSection,

    /// All tasks from `[[task]]`, in file order.
    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

/// Validated workflow file.
///
/// Only obtainable through `TryFrom<RawWorkflowFile>` (see
/// `config::validate`).
#[derive(Debug, Clone)]
pub struct WorkflowFile {
    pub engine: EngineSection,
    pub task: Vec<TaskConfig>,
}

impl WorkflowFile {
    pub(crate) fn new_unchecked(engine: EngineSection, task: Vec<TaskConfig>) -> Self {
        Self { engine, task }
    }

    pub fn options(&self) -> EngineOptions {
        self.engine.to_options()
    }

    /// Task definitions in file order, each backed by its shell command.
    pub fn definitions(&self) -> Vec<TaskDefinition> {
        self.task.iter().map(TaskConfig::to_definition).collect()
    }
}

/// `[engine]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    /// Instances per fan-out task.
    #[serde(default = "default_fanout_instances")]
    pub fanout_instances: usize,

    /// Backoff unit in milliseconds; the delay before attempt `n + 1` is
    /// `backoff_step_ms * n`.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,

    /// Warn about tasks slower than this. `0` disables the warning.
    #[serde(default = "default_slow_task_warning_ms")]
    pub slow_task_warning_ms: u64,

    /// Reject graphs with cycles or unknown dependencies up front.
    #[serde(default)]
    pub strict_graph: bool,
}

fn default_fanout_instances() -> usize {
    1
}

fn default_backoff_step_ms() -> u64 {
    DEFAULT_BACKOFF_STEP.as_millis() as u64
}

fn default_slow_task_warning_ms() -> u64 {
    DEFAULT_SLOW_TASK_THRESHOLD.as_millis() as u64
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            fanout_instances: default_fanout_instances(),
            backoff_step_ms: default_backoff_step_ms(),
            slow_task_warning_ms: default_slow_task_warning_ms(),
            strict_graph: false,
        }
    }
}

impl EngineSection {
    pub fn to_options(&self) -> EngineOptions {
        EngineOptions {
            fanout_instances: self.fanout_instances,
            backoff_step: Duration::from_millis(self.backoff_step_ms),
            slow_task_threshold: (self.slow_task_warning_ms > 0)
                .then(|| Duration::from_millis(self.slow_task_warning_ms)),
            strict_graph: self.strict_graph,
        }
    }
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Unique task id.
    pub id: String,

    /// Shell command run on every attempt.
    pub cmd: String,

    /// Ids of tasks that must complete first.
    #[serde(default, alias = "after")]
    pub dependencies: Vec<String>,

    /// Extra attempts after the first failure.
    #[serde(default)]
    pub retries: u32,

    /// Per-attempt timeout; unbounded when absent.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// `"sequential"` (default), `"parallel"` or `"fanout"`.
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Fan-out admission cap; defaults to the instance count.
    #[serde(default)]
    pub max_concurrency: Option<usize>,
}

impl TaskConfig {
    pub fn to_definition(&self) -> TaskDefinition {
        let mut builder = TaskDefinition::builder(self.id.clone(), CommandWork::new(&self.id, &self.cmd))
            .after_all(self.dependencies.iter().cloned())
            .retries(self.retries)
            .mode(self.mode);

        if let Some(ms) = self.timeout_ms {
            builder = builder.timeout_ms(ms);
        }
        if self.mode == ExecutionMode::Fanout {
            builder = builder.fanout(self.max_concurrency);
        }

        builder.build()
    }
}
