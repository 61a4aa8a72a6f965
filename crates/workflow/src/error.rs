//! Workflow-level error types.

use activities::ActivityError;
use thiserror::Error;

/// Errors produced while decoding or running a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    // ------ DSL input ------

    /// No decoding strategy produced a step tree.
    #[error(
        "invalid dsl input: expected a step tree or a nested 'input' object (top-level keys: {keys:?})"
    )]
    DslParse { keys: Vec<String> },

    /// A nested `input` / `Input` object was present but did not decode.
    #[error("malformed step tree under '{key}': {source}")]
    MalformedDsl {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A step tree node referenced a child that is not in the arena yet.
    #[error("step tree node {child} referenced before it was added")]
    DanglingNode { child: usize },

    // ------ Execution ------

    /// The call arguments were not `[version, input]`.
    #[error("invalid workflow arguments: {0}")]
    Arguments(String),

    /// An activity failed after the engine gave up on it.
    #[error("activity '{name}' failed: {source}")]
    Activity {
        name: String,
        #[source]
        source: ActivityError,
    },
}

/// Errors produced while assembling the workflow registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("workflow '{name}' is already registered")]
    Conflict { name: String },
}
