// src/dag/validate.rs

use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::debug;

use crate::dag::task_info::TaskRun;
use crate::engine::TaskName;
use crate::errors::{DagflowError, Result};
use crate::task::TaskDefinition;
use crate::types::ExecutionMode;

/// Check that task ids are unique and create one `Pending` [`TaskRun`] per
/// definition, keyed by id in input order.
///
/// `fanout_instances` is the per-run fan-out count; it only applies to
/// `Fanout` tasks, every other task gets exactly one instance.
///
/// No dependency analysis happens here: unknown dependencies and cycles are
/// accepted and simply leave the affected tasks `Pending`.
pub fn build_task_runs(
    defs: &[TaskDefinition],
    fanout_instances: usize,
) -> Result<IndexMap<TaskName, TaskRun>> {
    let mut runs = IndexMap::with_capacity(defs.len());

    for def in defs {
        match runs.entry(def.id.clone()) {
            Entry::Occupied(_) => {
                return Err(DagflowError::DuplicateTaskId(def.id.clone()));
            }
            Entry::Vacant(slot) => {
                let instances = match def.mode {
                    ExecutionMode::Fanout => fanout_instances.max(1),
                    ExecutionMode::Sequential | ExecutionMode::Parallel => 1,
                };
                slot.insert(TaskRun::new(def.id.clone(), def.mode, instances));
            }
        }
    }

    debug!(tasks = runs.len(), "task graph validated");
    Ok(runs)
}
