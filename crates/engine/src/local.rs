//! In-process workflow engine.
//!
//! `LocalEngine` implements both engine capabilities inside the current
//! process: the client side (start/describe/signal) and a poll-driven
//! worker that executes registered workflow functions on tokio tasks. It
//! keeps no history and does not survive a restart. Use it for
//! development (`serve --embedded`) and tests.
//!
//! Behaviour mirrors the remote engine where the facade can observe it:
//! - a running workflow ID cannot be started twice;
//! - describe answers the latest run in the engine's JSON shape;
//! - signals to closed executions are rejected.
//!
//! Closed executions are kept up to a retention limit
//! ([`DEFAULT_CLOSED_RETENTION`] unless built with
//! [`LocalEngine::with_retention`]); past it the oldest closed one is
//! forgotten and describes as not found.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use activities::{Activity, ActivityContext, ActivityError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use futures::FutureExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::client::{EngineClient, StartOptions, WorkflowRun};
use crate::worker::{
    ActivityDispatch, ActivityOptions, RegisterOptions, SignalInbox, WorkerHost, WorkflowContext,
    WorkflowFn, WorkflowInfo,
};
use crate::EngineError;

pub const DEFAULT_CLOSED_RETENTION: usize = 1000;

// ---------------------------------------------------------------------------
// Execution records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "WORKFLOW_EXECUTION_STATUS_RUNNING",
            Self::Completed => "WORKFLOW_EXECUTION_STATUS_COMPLETED",
            Self::Failed => "WORKFLOW_EXECUTION_STATUS_FAILED",
        }
    }
}

struct Execution {
    run_id: String,
    workflow_type: String,
    task_queue: String,
    status: ExecutionStatus,
    start_time: DateTime<Utc>,
    close_time: Option<DateTime<Utc>>,
    /// Close order, for retention.
    closed_seq: Option<u64>,
    result: Option<Value>,
    failure: Option<String>,
    signals: SignalInbox,
}

impl Execution {
    fn describe(&self, workflow_id: &str) -> Value {
        let mut info = json!({
            "execution": { "workflowId": workflow_id, "runId": self.run_id },
            "type": { "name": self.workflow_type },
            "startTime": self.start_time.to_rfc3339_opts(SecondsFormat::Millis, true),
            "status": self.status.as_str(),
            "taskQueue": self.task_queue,
        });
        if let Some(close_time) = self.close_time {
            info["closeTime"] = json!(close_time.to_rfc3339_opts(SecondsFormat::Millis, true));
        }

        let mut description = json!({
            "executionConfig": { "taskQueue": { "name": self.task_queue } },
            "workflowExecutionInfo": info,
        });
        if let Some(result) = &self.result {
            description["result"] = result.clone();
        }
        if let Some(message) = &self.failure {
            description["failure"] = json!({ "message": message });
        }
        description
    }
}

struct WorkflowTask {
    info: WorkflowInfo,
    args: Vec<Value>,
    signals: SignalInbox,
}

struct QueueSlot {
    sender: mpsc::UnboundedSender<WorkflowTask>,
    /// `None` while a worker is polling the queue.
    receiver: Option<mpsc::UnboundedReceiver<WorkflowTask>>,
}

impl QueueSlot {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Some(receiver),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared engine state
// ---------------------------------------------------------------------------

struct Shared {
    namespace: String,
    executions: Mutex<HashMap<String, Execution>>,
    queues: Mutex<HashMap<String, QueueSlot>>,
    closed: AtomicBool,
    retention: usize,
    close_counter: AtomicU64,
}

impl Shared {
    fn executions(&self) -> MutexGuard<'_, HashMap<String, Execution>> {
        self.executions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn queues(&self) -> MutexGuard<'_, HashMap<String, QueueSlot>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    fn sender_for(&self, task_queue: &str) -> mpsc::UnboundedSender<WorkflowTask> {
        self.queues()
            .entry(task_queue.to_string())
            .or_insert_with(QueueSlot::new)
            .sender
            .clone()
    }

    fn take_receiver(
        &self,
        task_queue: &str,
    ) -> Result<mpsc::UnboundedReceiver<WorkflowTask>, EngineError> {
        self.queues()
            .entry(task_queue.to_string())
            .or_insert_with(QueueSlot::new)
            .receiver
            .take()
            .ok_or_else(|| EngineError::QueueBusy(task_queue.to_string()))
    }

    fn return_receiver(&self, task_queue: &str, receiver: mpsc::UnboundedReceiver<WorkflowTask>) {
        if let Some(slot) = self.queues().get_mut(task_queue) {
            slot.receiver = Some(receiver);
        }
    }

    fn finish(&self, info: &WorkflowInfo, outcome: Result<Value, String>) {
        let mut executions = self.executions();
        let Some(execution) = executions
            .get_mut(&info.workflow_id)
            .filter(|e| e.run_id == info.run_id)
        else {
            return;
        };

        execution.close_time = Some(Utc::now());
        execution.closed_seq = Some(self.close_counter.fetch_add(1, Ordering::Relaxed));
        match outcome {
            Ok(result) => {
                execution.status = ExecutionStatus::Completed;
                execution.result = Some(result);
            }
            Err(message) => {
                execution.status = ExecutionStatus::Failed;
                execution.failure = Some(message);
            }
        }
        evict_closed(&mut executions, self.retention);
    }
}

fn evict_closed(executions: &mut HashMap<String, Execution>, retention: usize) {
    let mut closed: Vec<(u64, String)> = executions
        .iter()
        .filter_map(|(id, e)| e.closed_seq.map(|seq| (seq, id.clone())))
        .collect();
    if closed.len() <= retention {
        return;
    }
    closed.sort_unstable();
    let excess = closed.len() - retention;
    for (_, id) in closed.into_iter().take(excess) {
        executions.remove(&id);
    }
}

// ---------------------------------------------------------------------------
// LocalEngine
// ---------------------------------------------------------------------------

/// In-process engine. Clones share the same executions and task queues.
#[derive(Clone)]
pub struct LocalEngine {
    shared: Arc<Shared>,
}

impl LocalEngine {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::with_retention(namespace, DEFAULT_CLOSED_RETENTION)
    }

    /// Engine that remembers at most `max_closed` closed executions.
    pub fn with_retention(namespace: impl Into<String>, max_closed: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                namespace: namespace.into(),
                executions: Mutex::new(HashMap::new()),
                queues: Mutex::new(HashMap::new()),
                closed: AtomicBool::new(false),
                retention: max_closed,
                close_counter: AtomicU64::new(0),
            }),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.shared.namespace
    }

    /// Create a worker that will poll `task_queue` once [`LocalWorker::run`] is called.
    pub fn worker(&self, task_queue: impl Into<String>) -> LocalWorker {
        LocalWorker {
            shared: Arc::clone(&self.shared),
            task_queue: task_queue.into(),
            workflows: HashMap::new(),
            activities: HashMap::new(),
        }
    }

    /// Current status of the latest run of `workflow_id`.
    pub fn status(&self, workflow_id: &str) -> Option<ExecutionStatus> {
        self.shared.executions().get(workflow_id).map(|e| e.status)
    }
}

#[async_trait]
impl EngineClient for LocalEngine {
    async fn execute_workflow(
        &self,
        options: StartOptions,
        workflow_type: &str,
        args: Vec<Value>,
    ) -> Result<WorkflowRun, EngineError> {
        self.shared.ensure_open()?;

        let run_id = Uuid::new_v4().to_string();
        let signals = SignalInbox::default();
        {
            let mut executions = self.shared.executions();
            if executions
                .get(&options.id)
                .is_some_and(|e| e.status == ExecutionStatus::Running)
            {
                return Err(EngineError::AlreadyStarted {
                    workflow_id: options.id,
                });
            }
            executions.insert(
                options.id.clone(),
                Execution {
                    run_id: run_id.clone(),
                    workflow_type: workflow_type.to_string(),
                    task_queue: options.task_queue.clone(),
                    status: ExecutionStatus::Running,
                    start_time: Utc::now(),
                    close_time: None,
                    closed_seq: None,
                    result: None,
                    failure: None,
                    signals: signals.clone(),
                },
            );
        }

        let info = WorkflowInfo {
            workflow_id: options.id.clone(),
            run_id: run_id.clone(),
            workflow_type: workflow_type.to_string(),
            task_queue: options.task_queue.clone(),
        };
        let task = WorkflowTask { info, args, signals };
        if self.shared.sender_for(&options.task_queue).send(task).is_err() {
            self.shared.executions().remove(&options.id);
            return Err(EngineError::Rejected {
                status: 503,
                message: format!("task queue '{}' is unavailable", options.task_queue),
            });
        }

        Ok(WorkflowRun {
            id: options.id,
            run_id,
        })
    }

    async fn describe_execution(&self, workflow_id: &str, run_id: &str) -> Result<Value, EngineError> {
        self.shared.ensure_open()?;
        self.shared
            .executions()
            .get(workflow_id)
            .filter(|e| run_id.is_empty() || e.run_id == run_id)
            .map(|e| e.describe(workflow_id))
            .ok_or_else(|| EngineError::NotFound {
                workflow_id: workflow_id.to_string(),
            })
    }

    async fn signal_execution(
        &self,
        workflow_id: &str,
        run_id: &str,
        signal_name: &str,
        payload: Value,
    ) -> Result<(), EngineError> {
        self.shared.ensure_open()?;
        let executions = self.shared.executions();
        let execution = executions
            .get(workflow_id)
            .filter(|e| run_id.is_empty() || e.run_id == run_id)
            .ok_or_else(|| EngineError::NotFound {
                workflow_id: workflow_id.to_string(),
            })?;
        if execution.status != ExecutionStatus::Running {
            return Err(EngineError::AlreadyCompleted {
                workflow_id: workflow_id.to_string(),
            });
        }
        execution.signals.deliver(signal_name, payload);
        Ok(())
    }

    async fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// LocalWorker
// ---------------------------------------------------------------------------

/// Dispatch table plus poll loop for one task queue of a [`LocalEngine`].
pub struct LocalWorker {
    shared: Arc<Shared>,
    task_queue: String,
    workflows: HashMap<String, WorkflowFn>,
    activities: HashMap<String, Arc<dyn Activity>>,
}

impl WorkerHost for LocalWorker {
    fn register_workflow(
        &mut self,
        workflow: WorkflowFn,
        options: RegisterOptions,
    ) -> Result<(), EngineError> {
        if self.workflows.contains_key(&options.name) {
            return Err(EngineError::DuplicateWorkflow(options.name));
        }
        self.workflows.insert(options.name, workflow);
        Ok(())
    }

    fn register_activity(&mut self, activity: Arc<dyn Activity>) -> Result<(), EngineError> {
        let name = activity.name().to_string();
        if self.activities.contains_key(&name) {
            return Err(EngineError::DuplicateActivity(name));
        }
        self.activities.insert(name, activity);
        Ok(())
    }
}

impl LocalWorker {
    pub fn task_queue(&self) -> &str {
        &self.task_queue
    }

    /// Poll the task queue until `shutdown` resolves, running each workflow
    /// task on its own tokio task. In-flight executions keep running after
    /// the loop returns.
    pub async fn run<F>(self, shutdown: F) -> Result<(), EngineError>
    where
        F: std::future::Future<Output = ()>,
    {
        let LocalWorker {
            shared,
            task_queue,
            workflows,
            activities,
        } = self;

        let mut receiver = shared.take_receiver(&task_queue)?;
        let workflows = Arc::new(workflows);
        let dispatch: Arc<dyn ActivityDispatch> = Arc::new(LocalActivities { table: activities });

        info!(
            task_queue = %task_queue,
            workflows = workflows.len(),
            "local worker polling"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                task = receiver.recv() => match task {
                    Some(task) => {
                        tokio::spawn(run_task(
                            Arc::clone(&shared),
                            Arc::clone(&workflows),
                            Arc::clone(&dispatch),
                            task,
                        ));
                    }
                    None => break,
                },
            }
        }

        shared.return_receiver(&task_queue, receiver);
        info!(task_queue = %task_queue, "local worker stopped");
        Ok(())
    }
}

#[instrument(skip_all, fields(workflow_id = %task.info.workflow_id, workflow_type = %task.info.workflow_type))]
async fn run_task(
    shared: Arc<Shared>,
    workflows: Arc<HashMap<String, WorkflowFn>>,
    dispatch: Arc<dyn ActivityDispatch>,
    task: WorkflowTask,
) {
    let WorkflowTask { info, args, signals } = task;

    let outcome = match workflows.get(&info.workflow_type) {
        None => Err(format!(
            "workflow type '{}' is not registered on task queue '{}'",
            info.workflow_type, info.task_queue
        )),
        Some(entry) => {
            let ctx = WorkflowContext::new(info.clone(), dispatch, signals);
            match AssertUnwindSafe(entry(ctx, args)).catch_unwind().await {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => Err(format!("{e:#}")),
                Err(_) => Err("workflow task panicked".to_string()),
            }
        }
    };

    match &outcome {
        Ok(_) => info!("workflow execution completed"),
        Err(message) => error!(error = %message, "workflow execution failed"),
    }
    shared.finish(&info, outcome);
}

// ---------------------------------------------------------------------------
// Activity dispatch with timeout + retry
// ---------------------------------------------------------------------------

struct LocalActivities {
    table: HashMap<String, Arc<dyn Activity>>,
}

#[async_trait]
impl ActivityDispatch for LocalActivities {
    async fn dispatch(
        &self,
        info: &WorkflowInfo,
        activity_type: &str,
        input: Value,
        options: &ActivityOptions,
    ) -> Result<Value, ActivityError> {
        let activity = self.table.get(activity_type).ok_or_else(|| {
            ActivityError::Fatal(format!("activity type '{activity_type}' is not registered"))
        })?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let ctx = ActivityContext {
                workflow_id: info.workflow_id.clone(),
                run_id: info.run_id.clone(),
                activity_type: activity_type.to_string(),
                attempt,
            };

            let outcome = match tokio::time::timeout(
                options.start_to_close_timeout,
                activity.execute(input.clone(), &ctx),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ActivityError::Retryable(format!(
                    "start-to-close timeout of {:?} exceeded",
                    options.start_to_close_timeout
                ))),
            };

            let msg = match outcome {
                Ok(output) => return Ok(output),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(ActivityError::Retryable(msg) | ActivityError::Fatal(msg)) => msg,
            };
            if !options.retry.allows_retry_after(attempt) {
                return Err(ActivityError::Fatal(format!(
                    "activity '{activity_type}' exceeded retry limit after {attempt} attempts: {msg}"
                )));
            }

            let delay = options.retry.delay_after(attempt);
            warn!(
                activity = activity_type,
                attempt,
                max_attempts = options.retry.maximum_attempts,
                ?delay,
                error = %msg,
                "activity retryable error, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
