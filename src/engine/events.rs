// src/engine/events.rs

//! Lifecycle events and their observers.
//!
//! Observers are registered on an [`crate::engine::Engine`] before a run.
//! Each run snapshots them into an [`EventEmitter`], notifies them
//! synchronously while the run is in progress, and closes the emitter when
//! the run returns. Observers must not block: the engine calls them inline.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::engine::TaskName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    TaskStarted,
    TaskCompleted,
    TaskFailed,
    TaskRetried,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::TaskStarted => "TASK_STARTED",
            EventKind::TaskCompleted => "TASK_COMPLETED",
            EventKind::TaskFailed => "TASK_FAILED",
            EventKind::TaskRetried => "TASK_RETRIED",
        };
        f.write_str(s)
    }
}

/// One lifecycle notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowEvent {
    pub kind: EventKind,
    pub task_id: TaskName,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Observer of workflow events.
pub trait EventSink: Send + Sync {
    /// Called inline by the engine; must return promptly.
    fn on_event(&self, event: &WorkflowEvent);
}

struct EmitterInner {
    sinks: Vec<Arc<dyn EventSink>>,
    closed: AtomicBool,
}

/// Per-run fan-out point for events. Cheap to clone.
#[derive(Clone)]
pub struct EventEmitter {
    inner: Arc<EmitterInner>,
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sinks", &self.inner.sinks.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl EventEmitter {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self {
            inner: Arc::new(EmitterInner {
                sinks,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Emitter with no observers; events are only logged.
    pub fn detached() -> Self {
        Self::new(Vec::new())
    }

    /// Log the event and hand it to every observer.
    ///
    /// Events emitted after [`EventEmitter::close`] are dropped.
    pub fn emit(&self, kind: EventKind, task_id: &str, message: Option<String>) {
        if self.is_closed() {
            debug!(event = %kind, task = %task_id, "emitter closed; dropping event");
            return;
        }

        let event = WorkflowEvent {
            kind,
            task_id: task_id.to_string(),
            timestamp: Utc::now(),
            message,
        };

        info!(
            event = %event.kind,
            task = %event.task_id,
            timestamp = %event.timestamp.to_rfc3339(),
            message = event.message.as_deref().unwrap_or(""),
            "workflow event"
        );

        for sink in &self.inner.sinks {
            sink.on_event(&event);
        }
    }

    /// Stop delivering events. Called when the run returns.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

/// Observer that forwards events over an unbounded channel.
///
/// Sending never waits, so it is safe to register with any engine. Events
/// are silently dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<WorkflowEvent>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: &WorkflowEvent) {
        if self.tx.send(event.clone()).is_err() {
            trace!(task = %event.task_id, "event receiver dropped");
        }
    }
}
