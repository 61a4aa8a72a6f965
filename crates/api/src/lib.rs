//! `api` crate: HTTP intent mapper over the orchestration facade.
//!
//! Exposes:
//!   POST   /v1/workflow/start
//!   GET    /v1/workflow/{workflowId}/status
//!   POST   /v1/workflow/{workflowId}/signal
//!   GET    /v1/info
//!   GET    /swagger
//!   GET    /swagger/openapi.yaml

pub mod error;
pub mod handlers;

#[cfg(test)]
mod routes_tests;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use engine::OrchestrationClient;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<OrchestrationClient>,
    /// Config file read by `/v1/info` on each request.
    pub config_path: PathBuf,
    /// OpenAPI document served at `/swagger/openapi.yaml`.
    pub openapi_path: PathBuf,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/workflow/start", post(handlers::workflows::start))
        .route(
            "/v1/workflow/:workflowId/status",
            get(handlers::workflows::status),
        )
        .route(
            "/v1/workflow/:workflowId/signal",
            post(handlers::workflows::signal),
        )
        .route("/v1/info", get(handlers::info::info))
        .route("/swagger", get(handlers::swagger::ui))
        .route("/swagger/openapi.yaml", get(handlers::swagger::spec))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(addr: &str, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "http server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
