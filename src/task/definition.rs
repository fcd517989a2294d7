// src/task/definition.rs

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::TaskName;
use crate::task::work::{TaskValue, Work, WorkError, from_fn};
use crate::types::ExecutionMode;

/// Immutable description of one task in a graph.
///
/// The engine only ever reads a definition; the `work` handle is shared by
/// every attempt and every fan-out instance of the task.
#[derive(Clone)]
pub struct TaskDefinition {
    pub id: TaskName,
    pub work: Arc<dyn Work>,
    /// Ids of tasks that must be `Completed` before this one may run.
    pub dependencies: Vec<TaskName>,
    /// Extra attempts after the first one fails.
    pub max_retries: u32,
    /// Per-attempt bound; `None` means unbounded.
    pub timeout: Option<Duration>,
    pub mode: ExecutionMode,
    /// Admission cap for fan-out instances. Ignored unless `mode` is `Fanout`.
    pub fanout_max_concurrency: Option<usize>,
}

impl fmt::Debug for TaskDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDefinition")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .field("mode", &self.mode)
            .field("fanout_max_concurrency", &self.fanout_max_concurrency)
            .finish_non_exhaustive()
    }
}

impl TaskDefinition {
    /// Definition with default policies: no dependencies, no retries, no
    /// timeout, sequential.
    pub fn new(id: impl Into<TaskName>, work: impl Work + 'static) -> Self {
        Self {
            id: id.into(),
            work: Arc::new(work),
            dependencies: Vec::new(),
            max_retries: 0,
            timeout: None,
            mode: ExecutionMode::default(),
            fanout_max_concurrency: None,
        }
    }

    pub fn builder(id: impl Into<TaskName>, work: impl Work + 'static) -> TaskDefinitionBuilder {
        TaskDefinitionBuilder {
            def: TaskDefinition::new(id, work),
        }
    }

    /// Builder for a closure-backed task.
    pub fn from_fn<F, Fut>(id: impl Into<TaskName>, f: F) -> TaskDefinitionBuilder
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TaskValue, WorkError>> + Send + 'static,
    {
        TaskDefinition::builder(id, from_fn(f))
    }
}

/// Fluent builder for [`TaskDefinition`].
#[derive(Debug, Clone)]
pub struct TaskDefinitionBuilder {
    def: TaskDefinition,
}

impl TaskDefinitionBuilder {
    /// Add a dependency. Repeated ids are recorded once.
    pub fn after(mut self, dep: impl Into<TaskName>) -> Self {
        let dep = dep.into();
        if !self.def.dependencies.contains(&dep) {
            self.def.dependencies.push(dep);
        }
        self
    }

    pub fn after_all<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        for dep in deps {
            self = self.after(dep);
        }
        self
    }

    pub fn retries(mut self, max_retries: u32) -> Self {
        self.def.max_retries = max_retries;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.def.timeout = Some(timeout);
        self
    }

    pub fn timeout_ms(self, millis: u64) -> Self {
        self.timeout(Duration::from_millis(millis))
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.def.mode = mode;
        self
    }

    pub fn sequential(self) -> Self {
        self.mode(ExecutionMode::Sequential)
    }

    pub fn parallel(self) -> Self {
        self.mode(ExecutionMode::Parallel)
    }

    /// Mark as fan-out, optionally capping how many instances run at once.
    pub fn fanout(mut self, max_concurrency: Option<usize>) -> Self {
        self.def.mode = ExecutionMode::Fanout;
        self.def.fanout_max_concurrency = max_concurrency;
        self
    }

    pub fn build(self) -> TaskDefinition {
        self.def
    }
}

impl From<TaskDefinitionBuilder> for TaskDefinition {
    fn from(builder: TaskDefinitionBuilder) -> Self {
        builder.build()
    }
}
