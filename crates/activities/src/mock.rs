//! `MockActivity`: a test double for `Activity`.
//!
//! Useful in unit and integration tests where a real activity implementation
//! is either unavailable or irrelevant.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

use crate::{traits::ActivityContext, Activity, ActivityError};

/// Behaviour injected into `MockActivity` at construction time.
pub enum MockBehaviour {
    /// Return a specific JSON value.
    ReturnValue(Value),
    /// Return `{"activity": <name>, "input": <input>}`.
    Echo,
    /// Fail with a `Retryable` error for the first `n` attempts, then return the value.
    FlakyThen(u32, Value),
    /// Fail with a `Retryable` error.
    FailRetryable(String),
    /// Fail with a `Fatal` error.
    FailFatal(String),
}

/// A mock activity that records every call it receives and returns a
/// programmer-specified result.
pub struct MockActivity {
    /// Registered activity type.
    pub name: String,
    /// What the activity will do when `execute` is called.
    pub behaviour: MockBehaviour,
    /// All inputs seen by this activity (in call order).
    pub calls: Arc<Mutex<Vec<Value>>>,
}

impl MockActivity {
    fn with(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self::with(name, MockBehaviour::ReturnValue(value))
    }

    /// Create a mock that echoes its input back under `input`.
    pub fn echo(name: impl Into<String>) -> Self {
        Self::with(name, MockBehaviour::Echo)
    }

    /// Create a mock that fails `failures` times with a `Retryable` error before succeeding.
    pub fn flaky(name: impl Into<String>, failures: u32, value: Value) -> Self {
        Self::with(name, MockBehaviour::FlakyThen(failures, value))
    }

    /// Create a mock that always fails with a `Fatal` error.
    pub fn failing_fatal(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with(name, MockBehaviour::FailFatal(msg.into()))
    }

    /// Create a mock that always fails with a `Retryable` error.
    pub fn failing_retryable(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with(name, MockBehaviour::FailRetryable(msg.into()))
    }

    /// Shared handle to the recorded inputs, usable after the mock has been
    /// moved into an engine.
    pub fn recorder(&self) -> Arc<Mutex<Vec<Value>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Activity for MockActivity {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, input: Value, _ctx: &ActivityContext) -> Result<Value, ActivityError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(input.clone());
            calls.len() as u32
        };

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => Ok(v.clone()),
            MockBehaviour::Echo => Ok(json!({ "activity": self.name, "input": input })),
            MockBehaviour::FlakyThen(failures, v) => {
                if attempt <= *failures {
                    Err(ActivityError::Retryable(format!("attempt {attempt} failed")))
                } else {
                    Ok(v.clone())
                }
            }
            MockBehaviour::FailRetryable(msg) => Err(ActivityError::Retryable(msg.clone())),
            MockBehaviour::FailFatal(msg) => Err(ActivityError::Fatal(msg.clone())),
        }
    }
}
