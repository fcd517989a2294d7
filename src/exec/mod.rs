// src/exec/mod.rs

//! Execution layer.
//!
//! Everything that actually runs units of work lives here; the scheduler
//! only decides *what* runs.
//!
//! - [`attempt`] runs the per-attempt protocol (timeout race, retries,
//!   backoff).
//! - [`fanout`] expands a fan-out task into instances and reduces their
//!   outcomes.
//! - [`limiter`] is the admission gate bounding fan-out parallelism.
//! - [`task_runner`] picks the single or fan-out path for a dispatch.
//! - [`command`] provides the shell-command unit of work used by workflow
//!   files.

pub mod attempt;
pub mod command;
pub mod fanout;
pub mod limiter;
pub mod task_runner;

pub use attempt::{AttemptScope, RetryPolicy, run_attempt, run_with_retries};
pub use command::CommandWork;
pub use fanout::{FanoutOutcome, run_fanout};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use task_runner::{ExecContext, run_task};
