//! `OrchestrationClient`: the facade the HTTP layer talks to.
//!
//! Owns one engine connection plus the namespace and default task queue,
//! and translates intents (start / status / signal) into engine calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Map, Value};
use settings::TemporalSection;
use tracing::{info, instrument};

use crate::client::{EngineClient, StartOptions};
use crate::http::HttpEngineClient;
use crate::EngineError;

/// Identity of a started execution handed back to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowExecutionHandle {
    pub workflow_id: String,
    pub run_id: String,
}

pub struct OrchestrationClient {
    client: Arc<dyn EngineClient>,
    namespace: String,
    default_queue: String,
    last_stamp: AtomicU64,
}

impl OrchestrationClient {
    /// Dial the engine's HTTP API described by `temporal` (empty fields take
    /// their defaults). Fails with [`EngineError::Connection`]; there is no retry.
    pub async fn connect(temporal: &TemporalSection) -> Result<Self, EngineError> {
        let resolved = temporal.resolved();
        let client =
            HttpEngineClient::dial(&resolved.http_host_port, &resolved.namespace).await?;
        Ok(Self::from_client(Arc::new(client), &resolved))
    }

    /// Wrap an already-connected engine.
    pub fn from_client(client: Arc<dyn EngineClient>, temporal: &TemporalSection) -> Self {
        let resolved = temporal.resolved();
        Self {
            client,
            namespace: resolved.namespace,
            default_queue: resolved.default_task_queue,
            last_stamp: AtomicU64::new(0),
        }
    }

    pub fn client(&self) -> &Arc<dyn EngineClient> {
        &self.client
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn default_queue(&self) -> &str {
        &self.default_queue
    }

    /// Start `name` on the default task queue with arguments `[version, input]`.
    #[instrument(skip(self, input), fields(name = %name, version = %version))]
    pub async fn start_workflow(
        &self,
        name: &str,
        version: &str,
        input: Map<String, Value>,
    ) -> Result<WorkflowExecutionHandle, EngineError> {
        let options = StartOptions {
            id: format!("{name}-{}", self.next_stamp()),
            task_queue: self.default_queue.clone(),
        };

        let run = self
            .client
            .execute_workflow(options, name, vec![json!(version), Value::Object(input)])
            .await?;

        info!(workflow_id = %run.id, run_id = %run.run_id, "workflow started");
        Ok(WorkflowExecutionHandle {
            workflow_id: run.id,
            run_id: run.run_id,
        })
    }

    /// Describe the latest run of `workflow_id`.
    #[instrument(skip(self))]
    pub async fn query_status(&self, workflow_id: &str) -> Result<Value, EngineError> {
        let description = self.client.describe_execution(workflow_id, "").await?;
        Ok(json!({ "workflowExecutionInfo": description }))
    }

    /// Deliver a signal to the latest run of `workflow_id`.
    #[instrument(skip(self, payload), fields(signal = %signal_name))]
    pub async fn send_signal(
        &self,
        workflow_id: &str,
        signal_name: &str,
        payload: Value,
    ) -> Result<(), EngineError> {
        self.client
            .signal_execution(workflow_id, "", signal_name, payload)
            .await?;
        info!(workflow_id, "signal delivered");
        Ok(())
    }

    pub async fn close(&self) {
        self.client.close().await;
    }

    /// Wall-clock nanoseconds, bumped past the previously issued value so
    /// every stamp from this facade is distinct.
    fn next_stamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();

        let mut last = self.last_stamp.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self.last_stamp.compare_exchange_weak(
                last,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(observed) => last = observed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalEngine;
    use std::collections::HashSet;

    fn facade() -> OrchestrationClient {
        let engine = LocalEngine::new("default");
        OrchestrationClient::from_client(Arc::new(engine), &TemporalSection::default())
    }

    #[test]
    fn empty_settings_take_defaults() {
        let facade = facade();
        assert_eq!(facade.namespace(), "default");
        assert_eq!(facade.default_queue(), "zebra-task-queue");
    }

    #[tokio::test]
    async fn rapid_starts_get_unique_ids() {
        let facade = facade();
        let mut ids = HashSet::new();
        for _ in 0..200 {
            let handle = facade
                .start_workflow("SampleWorkflow", "v1", Map::new())
                .await
                .unwrap();
            assert!(handle.workflow_id.starts_with("SampleWorkflow-"));
            assert!(!handle.run_id.is_empty());
            assert!(ids.insert(handle.workflow_id));
        }
    }

    #[tokio::test]
    async fn concurrent_starts_get_unique_ids() {
        let facade = Arc::new(facade());
        let tasks: Vec<_> = (0..32)
            .map(|_| {
                let facade = Arc::clone(&facade);
                tokio::spawn(async move {
                    facade
                        .start_workflow("DSLWorkflow", "v1", Map::new())
                        .await
                        .unwrap()
                        .workflow_id
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for task in tasks {
            assert!(ids.insert(task.await.unwrap()));
        }
        assert_eq!(ids.len(), 32);
    }

    #[tokio::test]
    async fn query_status_wraps_description() {
        let facade = facade();
        let handle = facade
            .start_workflow("SampleWorkflow", "v1", Map::new())
            .await
            .unwrap();

        let status = facade.query_status(&handle.workflow_id).await.unwrap();
        let info = &status["workflowExecutionInfo"]["workflowExecutionInfo"];
        assert_eq!(info["execution"]["workflowId"], json!(handle.workflow_id));
        assert_eq!(info["execution"]["runId"], json!(handle.run_id));
        assert_eq!(info["status"], json!("WORKFLOW_EXECUTION_STATUS_RUNNING"));
    }

    #[tokio::test]
    async fn query_status_for_unknown_id_is_not_found() {
        let err = facade().query_status("missing-1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn closed_facade_rejects_calls() {
        let facade = facade();
        facade.close().await;
        let err = facade
            .start_workflow("SampleWorkflow", "v1", Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Closed));
    }
}
