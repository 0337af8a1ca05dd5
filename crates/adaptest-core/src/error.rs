//! Engine error types.
//!
//! All externally visible failures are deterministic given identical inputs:
//! the engine performs no I/O, so nothing here is transient or retryable.
//! Numeric divergence inside the estimator is not an error — it is recovered
//! locally and surfaces only through `AbilityEstimate::method`.

use thiserror::Error;

use crate::session::SessionState;

/// Errors raised by session operations and snapshot reconstruction.
#[derive(Debug, Error)]
pub enum SessionError {
    /// `start` was called with no items available.
    #[error("item pool is empty")]
    ItemPoolEmpty,

    /// An operation was attempted outside its valid state.
    #[error("{operation} is not valid in the {state} state")]
    InvalidSessionState {
        operation: &'static str,
        state: SessionState,
    },

    /// A response referenced an item that is unknown to the pool, already
    /// administered, or not the currently selected item.
    #[error("unknown or duplicate item: {0}")]
    UnknownOrDuplicateItem(String),

    /// A response score fell outside [0, 1].
    #[error("score {0} is outside [0.0, 1.0]")]
    ScoreOutOfRange(f64),

    /// A learner profile was created with a blank name.
    #[error("learner name must not be empty")]
    EmptyLearnerName,

    /// A snapshot failed invariant validation during reconstruction.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// A snapshot was written by an unknown schema version.
    #[error("unsupported snapshot version: {0}")]
    UnsupportedSnapshotVersion(u32),
}

impl SessionError {
    /// Returns `true` for errors that indicate a caller bug rather than bad
    /// input data, and should never be retried.
    pub fn is_caller_bug(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidSessionState { .. } | SessionError::UnknownOrDuplicateItem(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages() {
        assert_eq!(SessionError::ItemPoolEmpty.to_string(), "item pool is empty");
        assert_eq!(
            SessionError::UnknownOrDuplicateItem("q-17".into()).to_string(),
            "unknown or duplicate item: q-17"
        );
        assert_eq!(
            SessionError::InvalidSessionState {
                operation: "record_response",
                state: SessionState::Completed,
            }
            .to_string(),
            "record_response is not valid in the completed state"
        );
    }

    #[test]
    fn caller_bug_classification() {
        assert!(SessionError::UnknownOrDuplicateItem("x".into()).is_caller_bug());
        assert!(!SessionError::ItemPoolEmpty.is_caller_bug());
        assert!(!SessionError::ScoreOutOfRange(1.5).is_caller_bug());
    }
}
