// src/config/validate.rs

use crate::config::model::{RawWorkflowFile, WorkflowFile};
use crate::errors::{DagflowError, Result};
use crate::types::ExecutionMode;

impl TryFrom<RawWorkflowFile> for WorkflowFile {
    type Error = DagflowError;

    fn try_from(raw: RawWorkflowFile) -> std::result::Result<Self, Self::Error> {
        validate_workflow(&raw)?;
        Ok(WorkflowFile::new_unchecked(raw.engine, raw.task))
    }
}

/// Check a raw workflow file.
///
/// Duplicate ids, unknown dependencies and cycles are deliberately left to
/// the engine, which treats the first as fatal and the others as tasks that
/// never become ready.
pub fn validate_workflow(cfg: &RawWorkflowFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_engine_section(cfg)?;
    validate_tasks(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawWorkflowFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(DagflowError::ConfigError(
            "workflow must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_engine_section(cfg: &RawWorkflowFile) -> Result<()> {
    if cfg.engine.fanout_instances == 0 {
        return Err(DagflowError::ConfigError(
            "[engine].fanout_instances must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_tasks(cfg: &RawWorkflowFile) -> Result<()> {
    for (index, task) in cfg.task.iter().enumerate() {
        if task.id.trim().is_empty() {
            return Err(DagflowError::ConfigError(format!(
                "task #{} has an empty `id`",
                index + 1
            )));
        }
        if task.cmd.trim().is_empty() {
            return Err(DagflowError::ConfigError(format!(
                "task '{}' has an empty `cmd`",
                task.id
            )));
        }
        if task.timeout_ms == Some(0) {
            return Err(DagflowError::ConfigError(format!(
                "task '{}' has `timeout_ms = 0`; omit it for no timeout",
                task.id
            )));
        }
        match task.max_concurrency {
            Some(0) => {
                return Err(DagflowError::ConfigError(format!(
                    "task '{}' has `max_concurrency = 0`; it must be >= 1",
                    task.id
                )));
            }
            Some(_) if task.mode != ExecutionMode::Fanout => {
                tracing::warn!(
                    task = %task.id,
                    mode = %task.mode,
                    "`max_concurrency` only applies to fanout tasks; ignoring"
                );
            }
            _ => {}
        }
    }
    Ok(())
}
