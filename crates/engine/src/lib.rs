//! `engine` crate: the boundary to the external durable-workflow engine.
//!
//! Two capabilities are modelled as traits:
//! - [`EngineClient`]: start, describe and signal executions;
//! - [`WorkerHost`]: a dispatch table of workflow and activity implementations.
//!
//! [`HttpEngineClient`] speaks the engine's HTTP API. [`LocalEngine`] is an
//! in-process implementation of both. [`OrchestrationClient`] is the facade
//! used by the HTTP layer.

pub mod client;
pub mod error;
pub mod facade;
pub mod http;
pub mod local;
pub mod worker;


pub use client::{EngineClient, StartOptions, WorkflowRun};
pub use error::EngineError;
pub use facade::{OrchestrationClient, WorkflowExecutionHandle};
pub use http::HttpEngineClient;
pub use local::{ExecutionStatus, LocalEngine, LocalWorker};
pub use worker::{
    ActivityDispatch, ActivityOptions, RegisterOptions, RetryPolicy, SignalInbox, WorkerHost,
    WorkflowContext, WorkflowFn, WorkflowFuture, WorkflowInfo,
};
