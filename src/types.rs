// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the scheduling loop dispatches a ready task.
///
/// - `Sequential`: run one at a time, in input order, after the concurrent
///   tasks of the same iteration have been dispatched (default).
/// - `Parallel`: dispatched concurrently with the other ready tasks.
/// - `Fanout`: dispatched concurrently, and expanded into one instance per
///   fan-out slot of the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
    Fanout,
}

impl ExecutionMode {
    /// Whether tasks in this mode are dispatched concurrently.
    pub fn is_concurrent(self) -> bool {
        matches!(self, ExecutionMode::Parallel | ExecutionMode::Fanout)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Parallel => "parallel",
            ExecutionMode::Fanout => "fanout",
        };
        f.write_str(s)
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(ExecutionMode::Sequential),
            "parallel" => Ok(ExecutionMode::Parallel),
            "fanout" | "fan-out" => Ok(ExecutionMode::Fanout),
            other => Err(format!(
                "invalid execution mode: {other} (expected \"sequential\", \"parallel\" or \"fanout\")"
            )),
        }
    }
}
