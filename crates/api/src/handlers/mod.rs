//! Route handlers. Each one validates the request, calls the facade and
//! maps failures to [`crate::ApiError`].

pub mod info;
pub mod swagger;
pub mod workflows;

pub use crate::AppState;
