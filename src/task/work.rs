// src/task/work.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Value produced by a successful unit of work.
///
/// Fan-out tasks produce a JSON array holding one value per instance.
pub type TaskValue = serde_json::Value;

/// Boxed future returned by [`Work::call`].
///
/// It must be `'static` because every attempt is spawned onto the runtime,
/// which lets a timed-out attempt be abandoned instead of awaited.
pub type WorkFuture = Pin<Box<dyn Future<Output = Result<TaskValue, WorkError>> + Send + 'static>>;

/// Error returned by a unit of work.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct WorkError {
    message: String,
}

impl WorkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<anyhow::Error> for WorkError {
    fn from(err: anyhow::Error) -> Self {
        WorkError::new(format!("{err:#}"))
    }
}

impl From<String> for WorkError {
    fn from(message: String) -> Self {
        WorkError::new(message)
    }
}

impl From<&str> for WorkError {
    fn from(message: &str) -> Self {
        WorkError::new(message)
    }
}

/// A zero-argument unit of work.
///
/// Each call starts a fresh attempt; the engine calls it once per attempt
/// (and once per attempt of every fan-out instance).
pub trait Work: Send + Sync {
    fn call(&self) -> WorkFuture;
}

/// [`Work`] backed by a closure returning a future.
pub struct FnWork<F> {
    f: F,
}

impl<F> fmt::Debug for FnWork<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnWork").finish_non_exhaustive()
    }
}

impl<F, Fut> Work for FnWork<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<TaskValue, WorkError>> + Send + 'static,
{
    fn call(&self) -> WorkFuture {
        Box::pin((self.f)())
    }
}

/// Wrap a closure as a unit of work.
///
/// ```
/// use dagflow::task::{from_fn, TaskValue, WorkError};
///
/// let work = from_fn(|| async { Ok::<_, WorkError>(TaskValue::from("done")) });
/// # let _ = work;
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnWork<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<TaskValue, WorkError>> + Send + 'static,
{
    FnWork { f }
}
