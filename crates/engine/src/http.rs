//! [`EngineClient`] over the workflow engine's HTTP API.
//!
//! Payloads use the engine's JSON shorthand: call arguments travel as a
//! plain JSON array and come back unchanged in describe output.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::client::{EngineClient, StartOptions, WorkflowRun};
use crate::EngineError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpEngineClient {
    http: reqwest::Client,
    base_url: String,
    namespace: String,
    closed: AtomicBool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    #[serde(default)]
    run_id: String,
}

impl HttpEngineClient {
    /// Build a client and probe the namespace once. Any failure to get a
    /// success answer is reported as [`EngineError::Connection`].
    pub async fn dial(host_port: &str, namespace: &str) -> Result<Self, EngineError> {
        let connection_error = |reason: String| EngineError::Connection {
            host_port: host_port.to_string(),
            reason,
        };

        let http = reqwest::Client::builder()
            .connect_timeout(DIAL_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| connection_error(e.to_string()))?;

        let client = Self {
            http,
            base_url: base_url(host_port),
            namespace: namespace.to_string(),
            closed: AtomicBool::new(false),
        };

        let probe = client
            .http
            .get(client.namespace_url())
            .send()
            .await
            .map_err(|e| connection_error(e.to_string()))?;
        if !probe.status().is_success() {
            return Err(connection_error(format!(
                "namespace '{namespace}' probe answered {}",
                probe.status()
            )));
        }

        info!(host_port, namespace, "connected to workflow engine");
        Ok(client)
    }

    fn namespace_url(&self) -> String {
        namespace_url(&self.base_url, &self.namespace)
    }

    fn workflow_url(&self, workflow_id: &str) -> String {
        format!(
            "{}/workflows/{}",
            self.namespace_url(),
            urlencoding::encode(workflow_id)
        )
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }
        Ok(())
    }
}

fn base_url(host_port: &str) -> String {
    let trimmed = host_port.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

fn namespace_url(base_url: &str, namespace: &str) -> String {
    format!("{base_url}/api/v1/namespaces/{}", urlencoding::encode(namespace))
}

/// Map a non-success answer onto the engine error taxonomy.
async fn check(response: Response, workflow_id: &str) -> Result<Response, EngineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    match status {
        StatusCode::NOT_FOUND => Err(EngineError::NotFound {
            workflow_id: workflow_id.to_string(),
        }),
        StatusCode::CONFLICT => Err(EngineError::AlreadyStarted {
            workflow_id: workflow_id.to_string(),
        }),
        _ => Err(EngineError::Rejected {
            status: status.as_u16(),
            message: rejection_message(&text),
        }),
    }
}

fn rejection_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl EngineClient for HttpEngineClient {
    async fn execute_workflow(
        &self,
        options: StartOptions,
        workflow_type: &str,
        args: Vec<Value>,
    ) -> Result<WorkflowRun, EngineError> {
        self.ensure_open()?;
        let body = json!({
            "workflowId": options.id,
            "workflowType": { "name": workflow_type },
            "taskQueue": { "name": options.task_queue },
            "input": args,
            "requestId": Uuid::new_v4().to_string(),
        });

        debug!(workflow_id = %options.id, workflow_type, "starting workflow execution");
        let response = self
            .http
            .post(self.workflow_url(&options.id))
            .json(&body)
            .send()
            .await?;
        let started: StartResponse = check(response, &options.id).await?.json().await?;

        Ok(WorkflowRun {
            id: options.id,
            run_id: started.run_id,
        })
    }

    async fn describe_execution(&self, workflow_id: &str, run_id: &str) -> Result<Value, EngineError> {
        self.ensure_open()?;
        let response = self
            .http
            .get(self.workflow_url(workflow_id))
            .query(&[("execution.runId", run_id)])
            .send()
            .await?;
        Ok(check(response, workflow_id).await?.json().await?)
    }

    async fn signal_execution(
        &self,
        workflow_id: &str,
        run_id: &str,
        signal_name: &str,
        payload: Value,
    ) -> Result<(), EngineError> {
        self.ensure_open()?;
        let url = format!(
            "{}/signal/{}",
            self.workflow_url(workflow_id),
            urlencoding::encode(signal_name)
        );
        let mut body = json!({ "input": [payload] });
        if !run_id.is_empty() {
            body["workflowExecution"] = json!({ "workflowId": workflow_id, "runId": run_id });
        }

        let response = self.http.post(url).json(&body).send().await?;
        check(response, workflow_id).await?;
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
