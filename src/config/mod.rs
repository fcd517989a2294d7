// src/config/mod.rs

//! Workflow files for the `dagflow` binary.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a workflow file from disk (`loader.rs`).
//! - Validate field-level invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_workflow_path, load_and_validate, load_from_path, parse_str};
pub use model::{EngineSection, RawWorkflowFile, TaskConfig, WorkflowFile};
pub use validate::validate_workflow;
