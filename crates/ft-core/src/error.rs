//! Error taxonomy shared by the timer, the engine and the store.

use thiserror::Error;

use crate::types::ValidationError;

/// Errors surfaced by engine operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FocusError {
    /// A transition was attempted from a state that does not permit it.
    #[error("cannot {operation}: {reason}")]
    InvalidState {
        operation: &'static str,
        reason: String,
    },

    /// Malformed input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An operation referenced an activity or session that does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A durable write failed. The in-memory state is still authoritative.
    #[error("failed to persist store: {message}")]
    Persistence { message: String },
}

impl FocusError {
    pub fn invalid_state(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidState {
            operation,
            reason: reason.into(),
        }
    }

    pub fn activity_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "activity",
            id: id.into(),
        }
    }

    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "session",
            id: id.into(),
        }
    }
}
