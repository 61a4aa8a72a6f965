use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::ApiError;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub http_addr: String,
    pub temporal: TemporalInfo,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TemporalInfo {
    pub host_port: String,
    pub namespace: String,
    pub default_task_queue: String,
}

/// Re-reads the config file on every call. Engine values are reported as
/// written, without defaults.
pub async fn info(State(state): State<AppState>) -> Result<Json<InfoResponse>, ApiError> {
    let config = settings::load(&state.config_path)?;
    Ok(Json(InfoResponse {
        http_addr: config.http.addr_or_default().to_string(),
        temporal: TemporalInfo {
            host_port: config.temporal.host_port,
            namespace: config.temporal.namespace,
            default_task_queue: config.temporal.default_task_queue,
        },
    }))
}
