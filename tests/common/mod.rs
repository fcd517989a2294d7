#![allow(dead_code)]

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use dagflow::engine::{Engine, EngineOptions};
use dagflow::task::{TaskDefinition, TaskDefinitionBuilder, TaskValue, WorkError};

pub use dagflow_test_utils::{
    ConcurrencyProbe, OrderLog, RecordingSink, ScriptedWork, init_tracing, with_timeout,
};

pub type TestResult = Result<(), Box<dyn Error>>;

/// Options with a short backoff so retry tests stay fast.
pub fn fast_options() -> EngineOptions {
    EngineOptions {
        backoff_step: Duration::from_millis(5),
        ..EngineOptions::default()
    }
}

/// Engine with [`fast_options`] and a recording observer.
pub fn recording_engine(options: EngineOptions) -> (Engine, Arc<RecordingSink>) {
    let sink = RecordingSink::new();
    let mut engine = Engine::new(options);
    engine.register(sink.clone());
    (engine, sink)
}

/// Task that immediately succeeds with `value`.
pub fn ok_task(id: &str, value: impl Into<TaskValue>) -> TaskDefinitionBuilder {
    let value = value.into();
    TaskDefinition::from_fn(id, move || {
        let value = value.clone();
        async move { Ok::<_, WorkError>(value) }
    })
}

/// Task that always fails with `message`.
pub fn failing_task(id: &str, message: &str) -> TaskDefinitionBuilder {
    let message = message.to_string();
    TaskDefinition::from_fn(id, move || {
        let message = message.clone();
        async move { Err::<TaskValue, _>(WorkError::new(message)) }
    })
}
