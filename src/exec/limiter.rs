// src/exec/limiter.rs

//! Counting admission gate for fan-out instances.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

/// Bounds how many units of work run at once.
///
/// Backed by a tokio [`Semaphore`], which hands out permits in FIFO order:
/// when a slot frees up, the longest waiting caller gets it. One limiter is
/// created per fan-out dispatch; there is no global capacity.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Admission token. The slot is returned when the permit is dropped, so it
/// is released on every exit path of the guarded work, including failure,
/// timeout, and unwinding.
#[derive(Debug)]
pub struct LimiterPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Create a limiter with `capacity` slots. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently held.
    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }

    /// Wait for a free slot.
    pub async fn acquire(&self) -> LimiterPermit {
        let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            // The semaphore is private to the limiter and never closed.
            Err(_) => unreachable!("limiter semaphore closed"),
        };
        trace!(in_use = self.in_use(), capacity = self.capacity, "limiter slot acquired");
        LimiterPermit { _permit: permit }
    }
}
