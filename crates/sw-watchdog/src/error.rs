//! Error types for the watchdog.
//!
//! [`WatchdogError`] covers configuration, lifecycle and transport failures
//! surfaced to the caller. [`DetectionError`] covers liveliness events that
//! could not be attributed to a source; those never leave the watchdog.

use thiserror::Error;

use crate::lifecycle::{LifecycleState, Transition};

/// Errors that can occur during watchdog operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchdogError {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The requested transition is not valid from the current state.
    #[error("Invalid transition: cannot {event} from {from}")]
    InvalidTransition {
        /// State the watchdog was in.
        from: LifecycleState,
        /// Rejected transition.
        event: Transition,
    },

    /// The transport failed to subscribe or publish.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl WatchdogError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }

    /// Create an invalid transition error.
    #[must_use]
    pub fn invalid_transition(from: LifecycleState, event: Transition) -> Self {
        Self::InvalidTransition { from, event }
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport(reason.into())
    }
}

/// A specialized `Result` type for watchdog operations.
pub type WatchdogResult<T> = std::result::Result<T, WatchdogError>;

/// A liveliness loss that could not be pinned on a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DetectionError {
    /// No heartbeat has been cached yet.
    #[error("No heartbeats cached")]
    EmptyCache,

    /// No cached source is overdue enough to be blamed.
    #[error("No source qualifies as failed")]
    NoQualifyingSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WatchdogError::invalid_transition(LifecycleState::Active, Transition::Cleanup);
        assert!(err.to_string().contains("cleanup"));
        assert!(err.to_string().contains("active"));

        let err = WatchdogError::invalid_configuration("lease must be greater than 0");
        assert!(err.to_string().contains("lease"));
    }

    #[test]
    fn test_error_constructors() {
        let err = WatchdogError::transport("socket closed");
        assert!(matches!(err, WatchdogError::Transport(_)));

        assert_eq!(DetectionError::EmptyCache.to_string(), "No heartbeats cached");
    }
}
