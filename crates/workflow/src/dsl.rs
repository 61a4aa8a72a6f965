//! Step-tree executor.
//!
//! Runs a [`StepTree`] inside a workflow context:
//! 1. Bindings start as a copy of the tree's variables.
//! 2. An activity node receives `{argument: binding}` for each of its
//!    arguments (unbound names map to `null`) and stores its output under
//!    its `result` name.
//! 3. Sequences run children in order; parallels run them concurrently.
//!    The first failure aborts the enclosing node.
//! 4. The final bindings are the workflow result.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use engine::{ActivityOptions, RetryPolicy, WorkflowContext};
use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::models::{ActivityInvocation, NodeId, StepNode, StepTree};
use crate::WorkflowError;

/// Options applied to every activity scheduled from a step tree.
pub fn dsl_activity_options() -> ActivityOptions {
    ActivityOptions {
        start_to_close_timeout: Duration::from_secs(10),
        retry: RetryPolicy::default(),
    }
}

/// Execute `tree` and return the final bindings.
#[instrument(skip_all, fields(workflow_id = %ctx.info().workflow_id, nodes = tree.len()))]
pub async fn execute(
    ctx: &WorkflowContext,
    tree: &StepTree,
) -> Result<Map<String, Value>, WorkflowError> {
    let run = Run {
        ctx,
        tree,
        bindings: Mutex::new(tree.variables().clone()),
        options: dsl_activity_options(),
    };

    if let Some(root) = tree.root() {
        run.step(root).await?;
    }

    Ok(run
        .bindings
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner))
}

struct Run<'a> {
    ctx: &'a WorkflowContext,
    tree: &'a StepTree,
    bindings: Mutex<Map<String, Value>>,
    options: ActivityOptions,
}

impl Run<'_> {
    fn step(&self, id: NodeId) -> BoxFuture<'_, Result<(), WorkflowError>> {
        async move {
            match self.tree.node(id) {
                Some(StepNode::Activity(invocation)) => self.activity(invocation).await,
                Some(StepNode::Sequence(children)) => {
                    for child in children {
                        self.step(*child).await?;
                    }
                    Ok(())
                }
                Some(StepNode::Parallel(children)) => {
                    try_join_all(children.iter().map(|child| self.step(*child))).await?;
                    Ok(())
                }
                None => Ok(()),
            }
        }
        .boxed()
    }

    async fn activity(&self, invocation: &ActivityInvocation) -> Result<(), WorkflowError> {
        let input: Map<String, Value> = {
            let bindings = self.bindings.lock().unwrap_or_else(PoisonError::into_inner);
            invocation
                .arguments
                .iter()
                .map(|arg| (arg.clone(), bindings.get(arg).cloned().unwrap_or(Value::Null)))
                .collect()
        };

        debug!(activity = %invocation.name, arguments = ?invocation.arguments, "scheduling activity");
        let output = self
            .ctx
            .execute_activity(&invocation.name, Value::Object(input), &self.options)
            .await
            .map_err(|source| WorkflowError::Activity {
                name: invocation.name.clone(),
                source,
            })?;

        if let Some(result) = &invocation.result {
            self.bindings
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(result.clone(), output);
        }
        Ok(())
    }
}
