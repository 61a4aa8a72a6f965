//! `telemetry` crate: process logging and its hot-reload.
//!
//! [`init`] installs a reloadable subscriber built from the `logging`
//! section of the config file; [`watch`] follows that file and re-applies
//! the section whenever it changes.

pub mod config;
pub mod error;
pub mod logger;
pub mod sinks;
pub mod watch;

pub use config::{Encoding, LoggingConfig, Output};
pub use error::{LoggingError, WatchError};
pub use logger::{build, init, LoggerHandle, LoggingSubscriber};
pub use watch::{watch, ConfigWatch, DEBOUNCE};
