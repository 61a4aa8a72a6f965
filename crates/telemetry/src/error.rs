//! Typed error types for the telemetry crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to install the global subscriber: {0}")]
    Install(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to swap the active logger: {0}")]
    Reload(#[from] tracing_subscriber::reload::Error),

    #[error("failed to flush log outputs: {0}")]
    Flush(#[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("config path has no file name: {0}")]
    InvalidPath(PathBuf),

    #[error("failed to watch config directory: {0}")]
    Notify(#[from] notify::Error),
}
