//! `activities` crate: the `Activity` trait and the built-in activity implementations.
//!
//! Every activity a worker hands to the engine must implement [`Activity`].
//! The engine boundary dispatches activity tasks through this trait object.

pub mod error;
pub mod traits;
pub mod samples;
pub mod mock;

pub use error::ActivityError;
pub use traits::{Activity, ActivityContext};
pub use samples::builtin;
