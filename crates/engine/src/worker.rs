//! The worker-side engine capability: a dispatch table of named workflow
//! and activity implementations, plus the context handed to running
//! workflow code.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use activities::{Activity, ActivityError};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::Notify;

use crate::EngineError;

// ---------------------------------------------------------------------------
// Workflow entry points
// ---------------------------------------------------------------------------

/// Future returned by a workflow entry point.
pub type WorkflowFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// An executable workflow entry point. Receives the call arguments the
/// execution was started with.
pub type WorkflowFn = Arc<dyn Fn(WorkflowContext, Vec<Value>) -> WorkflowFuture + Send + Sync>;

/// Engine-facing registration metadata for a workflow entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterOptions {
    pub name: String,
}

/// A worker's dispatch table.
///
/// Registration happens before the worker's poll loop starts; a name that
/// is already bound is rejected.
pub trait WorkerHost {
    fn register_workflow(
        &mut self,
        workflow: WorkflowFn,
        options: RegisterOptions,
    ) -> Result<(), EngineError>;

    fn register_activity(&mut self, activity: Arc<dyn Activity>) -> Result<(), EngineError>;
}

// ---------------------------------------------------------------------------
// Activity options
// ---------------------------------------------------------------------------

/// Retry policy applied by the engine to `Retryable` activity failures and
/// to attempts that exceed their start-to-close timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub backoff_coefficient: f64,
    pub maximum_interval: Duration,
    /// `0` means unlimited attempts.
    pub maximum_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(100),
            maximum_attempts: 0,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        let capped = scaled.min(self.maximum_interval.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Whether another attempt may follow the given failed attempt.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        self.maximum_attempts == 0 || attempt < self.maximum_attempts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityOptions {
    pub start_to_close_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ActivityOptions {
    fn default() -> Self {
        Self {
            start_to_close_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

/// Executes activity tasks on behalf of running workflows.
#[async_trait]
pub trait ActivityDispatch: Send + Sync {
    async fn dispatch(
        &self,
        info: &WorkflowInfo,
        activity_type: &str,
        input: Value,
        options: &ActivityOptions,
    ) -> Result<Value, ActivityError>;
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Per-execution mailbox of delivered signals, keyed by signal name.
#[derive(Clone, Default)]
pub struct SignalInbox {
    inner: Arc<InboxInner>,
}

#[derive(Default)]
struct InboxInner {
    queued: Mutex<HashMap<String, VecDeque<Value>>>,
    notify: Notify,
}

impl SignalInbox {
    pub fn deliver(&self, signal_name: &str, payload: Value) {
        self.inner
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(signal_name.to_string())
            .or_default()
            .push_back(payload);
        self.inner.notify.notify_waiters();
    }

    pub fn try_take(&self, signal_name: &str) -> Option<Value> {
        self.inner
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(signal_name)
            .and_then(VecDeque::pop_front)
    }

    /// Wait for the next payload of `signal_name`.
    pub async fn take(&self, signal_name: &str) -> Value {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a delivery between the check and
            // the await still wakes us.
            notified.as_mut().enable();
            if let Some(payload) = self.try_take(signal_name) {
                return payload;
            }
            notified.await;
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowContext
// ---------------------------------------------------------------------------

/// Identity of the execution a workflow function is running in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowInfo {
    pub workflow_id: String,
    pub run_id: String,
    pub workflow_type: String,
    pub task_queue: String,
}

/// Handle given to workflow code by the engine. Cheap to clone.
#[derive(Clone)]
pub struct WorkflowContext {
    info: Arc<WorkflowInfo>,
    activities: Arc<dyn ActivityDispatch>,
    signals: SignalInbox,
}

impl WorkflowContext {
    pub fn new(info: WorkflowInfo, activities: Arc<dyn ActivityDispatch>, signals: SignalInbox) -> Self {
        Self {
            info: Arc::new(info),
            activities,
            signals,
        }
    }

    pub fn info(&self) -> &WorkflowInfo {
        &self.info
    }

    /// Schedule an activity and wait for its result.
    pub async fn execute_activity(
        &self,
        activity_type: &str,
        input: Value,
        options: &ActivityOptions,
    ) -> Result<Value, ActivityError> {
        self.activities
            .dispatch(&self.info, activity_type, input, options)
            .await
    }

    /// Wait for the next signal named `signal_name`.
    pub async fn receive_signal(&self, signal_name: &str) -> Value {
        self.signals.take(signal_name).await
    }

    pub fn try_receive_signal(&self, signal_name: &str) -> Option<Value> {
        self.signals.try_take(signal_name)
    }
}
