use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use super::AppState;
use crate::ApiError;

#[derive(Debug, Deserialize)]
pub struct StartWorkflowDto {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub input: Option<Map<String, Value>>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowResponse {
    pub workflow_id: String,
    pub run_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalDto {
    #[serde(default)]
    pub signal_name: String,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

fn required(value: &str, what: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{what} is required")));
    }
    Ok(())
}

pub async fn start(
    State(state): State<AppState>,
    payload: Result<Json<StartWorkflowDto>, JsonRejection>,
) -> Result<Json<StartWorkflowResponse>, ApiError> {
    let Json(req) = payload.inspect_err(|e| warn!(error = %e, "parse start request failed"))?;
    required(&req.name, "name")?;

    info!(name = %req.name, version = %req.version, "start workflow request");
    let handle = state
        .facade
        .start_workflow(&req.name, &req.version, req.input.unwrap_or_default())
        .await
        .inspect_err(|e| error!(name = %req.name, error = %e, "start workflow failed"))?;

    Ok(Json(StartWorkflowResponse {
        workflow_id: handle.workflow_id,
        run_id: handle.run_id,
    }))
}

pub async fn status(
    Path(workflow_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    required(&workflow_id, "workflowId")?;

    info!(workflow_id = %workflow_id, "query workflow status");
    let description = state
        .facade
        .query_status(&workflow_id)
        .await
        .inspect_err(|e| {
            error!(workflow_id = %workflow_id, error = %e, "query workflow status failed")
        })?;
    Ok(Json(description))
}

pub async fn signal(
    Path(workflow_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<SignalDto>, JsonRejection>,
) -> Result<(), ApiError> {
    let Json(req) = payload.inspect_err(|e| warn!(error = %e, "parse signal request failed"))?;
    required(&workflow_id, "workflowId")?;
    required(&req.signal_name, "signalName")?;

    info!(workflow_id = %workflow_id, signal = %req.signal_name, "sending signal to workflow");
    state
        .facade
        .send_signal(
            &workflow_id,
            &req.signal_name,
            Value::Object(req.payload.unwrap_or_default()),
        )
        .await
        .inspect_err(|e| error!(workflow_id = %workflow_id, error = %e, "send signal failed"))?;
    Ok(())
}
