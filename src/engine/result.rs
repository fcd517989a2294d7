// src/engine/result.rs

//! Caller-visible outcome of a run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::json;

use crate::dag::{InstanceOutcome, TaskRun, TaskState};
use crate::engine::TaskName;
use crate::errors::TaskFailure;
use crate::task::TaskValue;

/// Final state of one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub state: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskValue>,
    #[serde(
        rename = "error",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_failure"
    )]
    pub failure: Option<TaskFailure>,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<InstanceOutcome>,
    #[serde(skip)]
    pub elapsed: Option<Duration>,
}

impl TaskReport {
    /// Failure rendered as a message, as exposed to transports.
    pub fn error_message(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}

impl From<TaskRun> for TaskReport {
    fn from(run: TaskRun) -> Self {
        Self {
            state: run.state,
            result: run.result,
            failure: run.failure,
            attempts: run.attempts,
            instances: run.instances,
            elapsed: run.elapsed,
        }
    }
}

/// Mapping from task id to its final state, in input order.
///
/// Produced once when the scheduling loop stops; immutable afterwards. A task
/// left `Pending` could never become ready (cycle or unknown dependency).
#[derive(Debug, Clone)]
pub struct RunResult {
    tasks: IndexMap<TaskName, TaskReport>,
    elapsed: Duration,
    finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn from_runs(runs: IndexMap<TaskName, TaskRun>, elapsed: Duration) -> Self {
        let tasks = runs
            .into_iter()
            .map(|(id, run)| (id, TaskReport::from(run)))
            .collect();

        Self {
            tasks,
            elapsed,
            finished_at: Utc::now(),
        }
    }

    pub fn get(&self, task: &str) -> Option<&TaskReport> {
        self.tasks.get(task)
    }

    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.tasks.get(task).map(|report| report.state)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskReport)> {
        self.tasks.iter().map(|(id, report)| (id.as_str(), report))
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Whether every task completed.
    pub fn is_success(&self) -> bool {
        self.tasks
            .values()
            .all(|report| report.state == TaskState::Completed)
    }

    pub fn completed(&self) -> Vec<&str> {
        self.ids_in_state(TaskState::Completed)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.ids_in_state(TaskState::Failed)
    }

    pub fn pending(&self) -> Vec<&str> {
        self.ids_in_state(TaskState::Pending)
    }

    fn ids_in_state(&self, state: TaskState) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|(_, report)| report.state == state)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// JSON document in the shape served by the workflow HTTP endpoint:
    /// `{success, timestamp, metadata: {execution_time_ms, task_count}, data}`.
    pub fn to_response_json(&self) -> serde_json::Result<serde_json::Value> {
        let data = serde_json::to_value(&self.tasks)?;
        Ok(json!({
            "success": self.is_success(),
            "timestamp": self.finished_at.to_rfc3339(),
            "metadata": {
                "execution_time_ms": u64::try_from(self.elapsed.as_millis()).unwrap_or(u64::MAX),
                "task_count": self.task_count(),
            },
            "data": data,
        }))
    }
}

/// Serialize a failure as its display message.
pub fn serialize_failure<S>(failure: &Option<TaskFailure>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match failure {
        Some(failure) => serializer.serialize_some(&failure.to_string()),
        None => serializer.serialize_none(),
    }
}
