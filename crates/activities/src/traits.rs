//! The `Activity` trait: the contract every worker-side activity must fulfil.

use async_trait::async_trait;
use serde_json::Value;

use crate::ActivityError;

/// Per-attempt context handed to an activity by the engine.
///
/// Defined here (in the activities crate) so both the engine boundary and
/// individual activity implementations can import it without a circular
/// dependency.
#[derive(Debug, Clone)]
pub struct ActivityContext {
    /// ID of the workflow execution that scheduled this activity.
    pub workflow_id: String,
    /// Run ID of that execution.
    pub run_id: String,
    /// Registered activity type name (the dispatch key).
    pub activity_type: String,
    /// 1-based attempt counter.
    pub attempt: u32,
}

/// The core activity trait.
///
/// `name` is the activity type the engine dispatches on; DSL step trees
/// reference activities by this name.
#[async_trait]
pub trait Activity: Send + Sync {
    fn name(&self) -> &str;

    /// Execute one attempt of the activity with the JSON `input` built by
    /// the calling workflow, returning the activity's JSON output.
    async fn execute(&self, input: Value, ctx: &ActivityContext) -> Result<Value, ActivityError>;
}
