use std::sync::{Arc, Mutex};

use dagflow::engine::{EventKind, EventSink, WorkflowEvent};

/// Observer that keeps every event it sees, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().expect("recording sink poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("recording sink poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Event kinds for one task, in emission order.
    pub fn kinds_for(&self, task: &str) -> Vec<EventKind> {
        self.events()
            .into_iter()
            .filter(|e| e.task_id == task)
            .map(|e| e.kind)
            .collect()
    }

    /// Messages for one task, in emission order (`""` when absent).
    pub fn messages_for(&self, task: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.task_id == task)
            .map(|e| e.message.unwrap_or_default())
            .collect()
    }

    /// Task ids of all events of `kind`, in emission order.
    pub fn tasks_with(&self, kind: EventKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.task_id)
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn on_event(&self, event: &WorkflowEvent) {
        self.events
            .lock()
            .expect("recording sink poisoned")
            .push(event.clone());
    }
}
