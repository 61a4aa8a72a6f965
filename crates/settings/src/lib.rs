//! `settings` crate: the configuration file shared by the server and the
//! hot-reload watcher.
//!
//! No behaviour beyond loading and defaulting lives here; the logging
//! fallback rules belong to the telemetry crate.

pub mod addr;
pub mod error;
pub mod loader;
pub mod models;

pub use addr::{resolve_bind_addr, BindAddr};
pub use error::ConfigError;
pub use loader::load;
pub use models::{
    AppConfig, AppSection, HttpSection, LoggingSection, TemporalSection, DEFAULT_HOST_PORT,
    DEFAULT_HTTP_ADDR, DEFAULT_HTTP_API_PORT, DEFAULT_NAMESPACE, DEFAULT_TASK_QUEUE,
};
