//! Errors surfaced by the workflow engine boundary.

use thiserror::Error;

/// Errors produced by engine calls (start, describe, signal, registration).
///
/// Engine-side failures are passed through to callers as-is; the facade
/// never rewraps them.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Connection ------

    /// The engine could not be reached while dialing.
    #[error("unable to connect to workflow engine at {host_port}: {reason}")]
    Connection { host_port: String, reason: String },

    /// The connection has been closed by `close()`.
    #[error("workflow engine connection is closed")]
    Closed,

    // ------ Execution lookups ------

    /// No execution exists for the given workflow ID.
    #[error("workflow execution not found: {workflow_id}")]
    NotFound { workflow_id: String },

    /// A running execution already uses this workflow ID.
    #[error("workflow execution already started: {workflow_id}")]
    AlreadyStarted { workflow_id: String },

    /// The execution has already closed and cannot accept signals.
    #[error("workflow execution already completed: {workflow_id}")]
    AlreadyCompleted { workflow_id: String },

    // ------ Worker registration ------

    /// A workflow type with this name is already registered on the worker.
    #[error("workflow type '{0}' is already registered")]
    DuplicateWorkflow(String),

    /// An activity type with this name is already registered on the worker.
    #[error("activity type '{0}' is already registered")]
    DuplicateActivity(String),

    /// Another worker is already polling this task queue.
    #[error("task queue '{0}' is already being polled")]
    QueueBusy(String),

    // ------ Opaque engine failures ------

    /// The engine answered with a non-success status.
    #[error("workflow engine rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request never produced an answer.
    #[error("workflow engine transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
