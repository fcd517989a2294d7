//! Scripted units of work for engine tests.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dagflow::task::{TaskValue, Work, WorkError, WorkFuture};

/// Work that fails its first `fail_first` calls, then succeeds with `value`.
///
/// Every call is counted, including ones that are later abandoned.
#[derive(Debug, Clone)]
pub struct ScriptedWork {
    calls: Arc<AtomicU32>,
    fail_first: u32,
    value: TaskValue,
    delay: Option<Duration>,
}

impl ScriptedWork {
    pub fn succeeding(value: impl Into<TaskValue>) -> Self {
        Self {
            calls: Arc::new(AtomicU32::new(0)),
            fail_first: 0,
            value: value.into(),
            delay: None,
        }
    }

    pub fn failing_first(times: u32, value: impl Into<TaskValue>) -> Self {
        Self {
            fail_first: times,
            ..Self::succeeding(value)
        }
    }

    pub fn always_failing() -> Self {
        Self::failing_first(u32::MAX, TaskValue::Null)
    }

    /// Sleep this long on every call before deciding the outcome.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared call counter; clone it before handing the work to a task.
    pub fn counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.calls)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Work for ScriptedWork {
    fn call(&self) -> WorkFuture {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail = call <= self.fail_first;
        let value = self.value.clone();
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if fail {
                Err(WorkError::new(format!("scripted failure #{call}")))
            } else {
                Ok(value)
            }
        })
    }
}

/// Tracks how many probe works are inside their body at once.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyProbe {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    started: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Work that holds a slot for `hold`, then returns the number of calls
    /// started before it.
    pub fn work(&self, hold: Duration) -> impl Work + use<> {
        ProbeWork {
            probe: self.clone(),
            hold,
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

struct ProbeWork {
    probe: ConcurrencyProbe,
    hold: Duration,
}

impl Work for ProbeWork {
    fn call(&self) -> WorkFuture {
        let probe = self.probe.clone();
        let hold = self.hold;
        Box::pin(async move {
            let seq = probe.started.fetch_add(1, Ordering::SeqCst);
            let now = probe.current.fetch_add(1, Ordering::SeqCst) + 1;
            probe.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(hold).await;
            probe.current.fetch_sub(1, Ordering::SeqCst);
            Ok(TaskValue::from(seq as u64))
        })
    }
}

/// Shared log of labels, appended when a work starts and when it ends.
#[derive(Debug, Clone, Default)]
pub struct OrderLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl OrderLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Work that logs `"<label>:start"`, sleeps for `hold`, logs
    /// `"<label>:end"` and returns `label`.
    pub fn work(&self, label: &str, hold: Duration) -> impl Work + use<> {
        LoggedWork {
            log: self.clone(),
            label: label.to_string(),
            hold,
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().expect("order log poisoned").clone()
    }

    /// Index of `entry` in the log.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }

    fn push(&self, entry: String) {
        self.entries.lock().expect("order log poisoned").push(entry);
    }
}

struct LoggedWork {
    log: OrderLog,
    label: String,
    hold: Duration,
}

impl Work for LoggedWork {
    fn call(&self) -> WorkFuture {
        let log = self.log.clone();
        let label = self.label.clone();
        let hold = self.hold;
        Box::pin(async move {
            log.push(format!("{label}:start"));
            if !hold.is_zero() {
                tokio::time::sleep(hold).await;
            }
            log.push(format!("{label}:end"));
            Ok(TaskValue::from(label))
        })
    }
}
