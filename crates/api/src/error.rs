//! HTTP error envelope.
//!
//! Every failure is answered with `{"error": <message>, "kind": <kind>}`.
//! The message is the underlying error's display text, unmodified.

use std::path::PathBuf;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use engine::EngineError;
use serde_json::json;
use settings::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request body or missing required field.
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Engine(EngineError::NotFound { .. }) => "not_found",
            Self::Engine(EngineError::AlreadyStarted { .. }) => "already_started",
            Self::Engine(EngineError::AlreadyCompleted { .. }) => "already_completed",
            Self::Engine(EngineError::Connection { .. }) => "connection",
            Self::Engine(_) => "engine",
            Self::Config(_) => "config",
            Self::Io { .. } => "io",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Engine(e) => match e {
                EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
                EngineError::AlreadyStarted { .. } | EngineError::AlreadyCompleted { .. } => {
                    StatusCode::CONFLICT
                }
                EngineError::Connection { .. } | EngineError::Closed => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                EngineError::Rejected { status, .. } => StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                EngineError::Transport(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Config(_) | Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.to_string(), "kind": self.kind() });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_keep_their_message_and_map_status() {
        let err = ApiError::from(EngineError::NotFound {
            workflow_id: "wf-1".into(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.kind(), "not_found");
        assert_eq!(err.to_string(), "workflow execution not found: wf-1");

        let err = ApiError::from(EngineError::AlreadyCompleted {
            workflow_id: "wf-1".into(),
        });
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn rejected_status_passes_through_when_it_is_an_error() {
        let rejected = |status| {
            ApiError::from(EngineError::Rejected {
                status,
                message: "nope".into(),
            })
        };
        assert_eq!(rejected(429).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(rejected(503).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(rejected(200).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(rejected(42).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(rejected(429).kind(), "engine");
    }
}
