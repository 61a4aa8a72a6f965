//! `workflow` crate: the step tree, the DSL input adapter, the workflow
//! registry and the built-in workflows a worker registers with the engine.

pub mod adapter;
pub mod builtin;
pub mod dsl;
pub mod error;
pub mod models;
pub mod registry;
pub mod worker;

pub use adapter::{normalize, DecodeOutcome, InputShape};
pub use error::{RegistryError, WorkflowError};
pub use models::{ActivityInvocation, NodeId, StepNode, StepTree};
pub use registry::{builtin, register_options, RegisteredWorkflow, WorkflowRegistry};
pub use worker::register_all;
