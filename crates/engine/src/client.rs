//! The client-side engine capability: start, describe and signal executions.

use async_trait::async_trait;
use serde_json::Value;

use crate::EngineError;

/// Options for starting a workflow execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOptions {
    /// Caller-chosen workflow ID.
    pub id: String,
    /// Task queue the execution is scheduled on.
    pub task_queue: String,
}

/// Identity of a started execution as acknowledged by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    pub id: String,
    pub run_id: String,
}

/// A live connection to the workflow engine.
///
/// Implementations must tolerate concurrent multiplexed calls: the facade
/// shares one client across every HTTP request handler without locking.
/// An empty `run_id` always means "latest run".
#[async_trait]
pub trait EngineClient: Send + Sync {
    async fn execute_workflow(
        &self,
        options: StartOptions,
        workflow_type: &str,
        args: Vec<Value>,
    ) -> Result<WorkflowRun, EngineError>;

    async fn describe_execution(&self, workflow_id: &str, run_id: &str) -> Result<Value, EngineError>;

    async fn signal_execution(
        &self,
        workflow_id: &str,
        run_id: &str,
        signal_name: &str,
        payload: Value,
    ) -> Result<(), EngineError>;

    /// Release the connection. Subsequent calls fail with [`EngineError::Closed`].
    async fn close(&self);
}
