//! Activity-level error type.

use thiserror::Error;

/// Errors returned by an activity's `execute` method.
///
/// The engine uses the variant to decide retry behaviour:
/// - `Retryable`: the attempt is retried according to the activity's retry policy.
/// - `Fatal`: the failure is handed straight back to the calling workflow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActivityError {
    /// Transient failure; the engine should re-try the activity.
    #[error("retryable activity error: {0}")]
    Retryable(String),

    /// Permanent failure; no retry should be attempted.
    #[error("fatal activity error: {0}")]
    Fatal(String),
}

impl ActivityError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_retryable_errors_are_retried() {
        assert!(ActivityError::Retryable("timeout".into()).is_retryable());
        assert!(!ActivityError::Fatal("bad input".into()).is_retryable());
    }
}
