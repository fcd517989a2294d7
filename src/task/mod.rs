// src/task/mod.rs

//! Task definitions: the immutable input of a run.
//!
//! - [`definition`] holds [`TaskDefinition`] and its builder. The builder is
//!   how callers (the CLI config layer, tests, embedding applications)
//!   produce the ordered task sequence handed to the engine.
//! - [`work`] defines the [`Work`] seam: a zero-argument unit of work that
//!   resolves to a [`TaskValue`] or a [`WorkError`].

pub mod definition;
pub mod work;

pub use definition::{TaskDefinition, TaskDefinitionBuilder};
pub use work::{FnWork, TaskValue, Work, WorkError, WorkFuture, from_fn};
