//! Built-in sample activities registered by every worker.
//!
//! The names match the activity types referenced by the sample workflow and
//! by DSL step trees (`activity.name`).

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{traits::ActivityContext, Activity, ActivityError};

const UNKNOWN_TITLE: &str = "未知标题";

/// Every built-in activity, ready to hand to a worker.
pub fn builtin() -> Vec<Arc<dyn Activity>> {
    vec![
        Arc::new(DoSomethingActivity),
        Arc::new(SampleActivity),
        Arc::new(SendEmailActivity),
        Arc::new(SendEmailTypedActivity),
        Arc::new(GetTitleActivity),
    ]
}

fn object(input: Value) -> Map<String, Value> {
    match input {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn string_field(input: &Map<String, Value>, key: &str) -> String {
    match input.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// DoSomethingActivity
// ---------------------------------------------------------------------------

/// Activity invoked by `SampleWorkflow`; acknowledges its input.
pub struct DoSomethingActivity;

#[async_trait]
impl Activity for DoSomethingActivity {
    fn name(&self) -> &str {
        "DoSomethingActivity"
    }

    async fn execute(&self, input: Value, ctx: &ActivityContext) -> Result<Value, ActivityError> {
        info!(workflow_id = %ctx.workflow_id, input = %input, "DoSomethingActivity finished");
        Ok(Value::String("ok".into()))
    }
}

// ---------------------------------------------------------------------------
// SampleActivity
// ---------------------------------------------------------------------------

/// Generic DSL step: reports which activity type ran with which arguments.
pub struct SampleActivity;

#[async_trait]
impl Activity for SampleActivity {
    fn name(&self) -> &str {
        "SampleActivity"
    }

    async fn execute(&self, input: Value, ctx: &ActivityContext) -> Result<Value, ActivityError> {
        info!(activity = %ctx.activity_type, input = %input, "running sample activity");
        Ok(json!({ "activity": ctx.activity_type, "input": input }))
    }
}

// ---------------------------------------------------------------------------
// SampleActivitySendEmail / SampleActivitySendEmailTyped
// ---------------------------------------------------------------------------

/// Reads `to` / `subject` / `body` by key and reports the recipient.
pub struct SendEmailActivity;

#[async_trait]
impl Activity for SendEmailActivity {
    fn name(&self) -> &str {
        "SampleActivitySendEmail"
    }

    async fn execute(&self, input: Value, _ctx: &ActivityContext) -> Result<Value, ActivityError> {
        let input = object(input);
        let to = string_field(&input, "to");
        info!(
            to = %to,
            subject = %string_field(&input, "subject"),
            body = %string_field(&input, "body"),
            "send email activity"
        );
        Ok(Value::String(format!("email_sent_to_{to}")))
    }
}

/// Typed input of [`SendEmailTypedActivity`].
#[derive(Debug, Default, Deserialize)]
pub struct SendEmailInput {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

/// Same as [`SendEmailActivity`] but decodes its input into [`SendEmailInput`] first.
pub struct SendEmailTypedActivity;

#[async_trait]
impl Activity for SendEmailTypedActivity {
    fn name(&self) -> &str {
        "SampleActivitySendEmailTyped"
    }

    async fn execute(&self, input: Value, _ctx: &ActivityContext) -> Result<Value, ActivityError> {
        let email: SendEmailInput = serde_json::from_value(input)
            .map_err(|e| ActivityError::Fatal(format!("invalid send-email input: {e}")))?;
        info!(to = %email.to, subject = %email.subject, "typed send email activity");
        Ok(json!({ "email_sent_to_": email.to }))
    }
}

// ---------------------------------------------------------------------------
// GetTitle
// ---------------------------------------------------------------------------

/// Pulls `title` out of the `r1` binding, which holds an earlier article
/// result either as an object or as its JSON text.
pub struct GetTitleActivity;

impl GetTitleActivity {
    fn title_of(r1: &Value) -> Option<String> {
        let article = match r1 {
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(error = %e, "r1 is not valid JSON");
                    return None;
                }
            },
            other => other.clone(),
        };
        match article.get("title") {
            Some(Value::String(title)) => Some(title.clone()),
            Some(_) => {
                warn!("title field is not a string");
                None
            }
            None => {
                warn!("title field not found");
                None
            }
        }
    }
}

#[async_trait]
impl Activity for GetTitleActivity {
    fn name(&self) -> &str {
        "GetTitle"
    }

    async fn execute(&self, input: Value, _ctx: &ActivityContext) -> Result<Value, ActivityError> {
        let title = match input.get("r1") {
            Some(r1) => Self::title_of(r1),
            None => {
                warn!("r1 binding not found");
                None
            }
        };
        let title = title.unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        Ok(json!({ "标题": title }))
    }
}
