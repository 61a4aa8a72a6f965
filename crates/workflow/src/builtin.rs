//! Built-in workflow entry points.
//!
//! Every entry point is started with the arguments `[version, input]`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use engine::{ActivityOptions, RetryPolicy, WorkflowContext, WorkflowFn};
use futures::future::{self, FutureExt};
use serde_json::{Map, Value};
use tracing::info;

use crate::{adapter, dsl, WorkflowError};

/// Split the call arguments into the version string and the input map.
/// A missing or `null` input is an empty map.
pub fn decode_args(args: &[Value]) -> Result<(String, Map<String, Value>), WorkflowError> {
    let version = match args.first() {
        Some(Value::String(version)) => version.clone(),
        Some(other) => {
            return Err(WorkflowError::Arguments(format!(
                "version must be a string, found {other}"
            )))
        }
        None => {
            return Err(WorkflowError::Arguments(
                "expected [version, input], found no arguments".to_string(),
            ))
        }
    };

    let input = match args.get(1) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(input)) => input.clone(),
        Some(other) => {
            return Err(WorkflowError::Arguments(format!(
                "input must be an object, found {other}"
            )))
        }
    };

    Ok((version, input))
}

/// Adapt a typed `(ctx, version, input)` function into an engine entry point.
pub fn entry<F, Fut>(f: F) -> WorkflowFn
where
    F: Fn(WorkflowContext, String, Map<String, Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, WorkflowError>> + Send + 'static,
{
    Arc::new(move |ctx, args| match decode_args(&args) {
        Ok((version, input)) => f(ctx, version, input)
            .map(|r| r.map_err(anyhow::Error::from))
            .boxed(),
        Err(e) => future::ready(Err(anyhow::Error::from(e))).boxed(),
    })
}

// ---------------------------------------------------------------------------
// SampleWorkflow
// ---------------------------------------------------------------------------

pub fn sample_activity_options() -> ActivityOptions {
    ActivityOptions {
        start_to_close_timeout: Duration::from_secs(60),
        retry: RetryPolicy {
            initial_interval: Duration::from_secs(5),
            backoff_coefficient: 2.0,
            maximum_interval: Duration::from_secs(60),
            maximum_attempts: 5,
        },
    }
}

/// Runs `DoSomethingActivity` with the start input and returns its result.
pub async fn sample_workflow(
    ctx: WorkflowContext,
    version: String,
    input: Map<String, Value>,
) -> Result<Value, WorkflowError> {
    info!(version = %version, "SampleWorkflow started");

    let result = ctx
        .execute_activity(
            "DoSomethingActivity",
            Value::Object(input),
            &sample_activity_options(),
        )
        .await
        .map_err(|source| WorkflowError::Activity {
            name: "DoSomethingActivity".to_string(),
            source,
        })?;

    info!(result = %result, "SampleWorkflow finished");
    Ok(result)
}

pub fn sample_workflow_fn() -> WorkflowFn {
    entry(sample_workflow)
}

// ---------------------------------------------------------------------------
// DSLWorkflow
// ---------------------------------------------------------------------------

/// Normalizes the input into a step tree and executes it. Returns the
/// final variable bindings.
pub async fn dsl_workflow(
    ctx: WorkflowContext,
    version: String,
    input: Map<String, Value>,
) -> Result<Value, WorkflowError> {
    let (tree, _shape) = adapter::normalize(&input, &version)?;
    let bindings = dsl::execute(&ctx, &tree).await?;
    Ok(Value::Object(bindings))
}

pub fn dsl_workflow_fn() -> WorkflowFn {
    entry(dsl_workflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_args_accepts_version_and_input() {
        let (version, input) = decode_args(&[json!("v1"), json!({ "a": 1 })]).unwrap();
        assert_eq!(version, "v1");
        assert_eq!(input["a"], json!(1));
    }

    #[test]
    fn decode_args_treats_missing_input_as_empty() {
        let (_, input) = decode_args(&[json!("v2")]).unwrap();
        assert!(input.is_empty());
        let (_, input) = decode_args(&[json!("v2"), Value::Null]).unwrap();
        assert!(input.is_empty());
    }

    #[test]
    fn decode_args_rejects_bad_shapes() {
        assert!(matches!(decode_args(&[]), Err(WorkflowError::Arguments(_))));
        assert!(matches!(
            decode_args(&[json!(1), json!({})]),
            Err(WorkflowError::Arguments(_))
        ));
        assert!(matches!(
            decode_args(&[json!("v1"), json!([1])]),
            Err(WorkflowError::Arguments(_))
        ));
    }

    #[test]
    fn sample_retry_policy_matches_documented_values() {
        let options = sample_activity_options();
        assert_eq!(options.start_to_close_timeout, Duration::from_secs(60));
        assert_eq!(options.retry.maximum_attempts, 5);
        assert_eq!(options.retry.delay_after(1), Duration::from_secs(5));
        assert_eq!(options.retry.delay_after(3), Duration::from_secs(20));
    }
}
