// src/exec/command.rs

//! Shell-command unit of work, used by workflow files.

use std::process::Stdio;

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, info};

use crate::engine::TaskName;
use crate::task::{TaskValue, Work, WorkError, WorkFuture};

/// Runs `cmd` through the platform shell on every attempt.
///
/// Succeeds with the trimmed stdout (as a JSON string) when the process
/// exits with status 0; otherwise fails with the exit code and trimmed
/// stderr.
#[derive(Debug, Clone)]
pub struct CommandWork {
    task: TaskName,
    cmd: String,
}

impl CommandWork {
    pub fn new(task: impl Into<TaskName>, cmd: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            cmd: cmd.into(),
        }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

impl Work for CommandWork {
    fn call(&self) -> WorkFuture {
        let task = self.task.clone();
        let cmd = self.cmd.clone();
        Box::pin(async move { run_command(&task, &cmd).await })
    }
}

async fn run_command(task: &str, cmd: &str) -> Result<TaskValue, WorkError> {
    info!(task = %task, cmd = %cmd, "starting task process");

    // Build a shell command appropriate for the platform.
    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = command
        .output()
        .await
        .with_context(|| format!("running process for task '{task}'"))?;

    let code = output.status.code().unwrap_or(-1);
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    for line in stderr.lines() {
        debug!(task = %task, "stderr: {}", line);
    }

    info!(
        task = %task,
        exit_code = code,
        success = output.status.success(),
        "task process exited"
    );

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(TaskValue::String(stdout))
    } else if stderr.is_empty() {
        Err(WorkError::new(format!("command exited with code {code}")))
    } else {
        Err(WorkError::new(format!("command exited with code {code}: {stderr}")))
    }
}
