//! Typed errors for the intake library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell
//! caller mistakes, lifecycle conflicts and dependency failures apart.

use thiserror::Error;

use crate::types::lifecycle::RequestStatus;

/// Errors raised by intake operations.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// Input rejected before any state was touched
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Lifecycle transition rejected
    #[error("state conflict: {0}")]
    Transition(#[from] TransitionError),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Job emission failed
    #[error("job emission error: {0}")]
    Emit(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntakeError {
    /// Wrap any error as a storage failure.
    pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        IntakeError::Storage(err.into())
    }

    /// Wrap any error as an emission failure.
    pub fn emit(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        IntakeError::Emit(err.into())
    }
}

/// Caller-side input errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// URL was empty or whitespace
    #[error("URL cannot be blank")]
    BlankUrl,

    /// Request id is not a UUID
    #[error("invalid request id: {value}")]
    InvalidRequestId { value: String },

    /// Stored identity is not a 64 character hex digest
    #[error("invalid URL identity: {value}")]
    InvalidIdentity { value: String },

    /// Content item label was empty or whitespace
    #[error("item label cannot be blank")]
    BlankItemLabel,
}

/// Rejected lifecycle transitions.
///
/// These are protocol errors: the caller asked for a move the state machine
/// does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Source state is terminal
    #[error("cannot transition from terminal state {from} to {to}")]
    FromTerminal {
        from: RequestStatus,
        to: RequestStatus,
    },

    /// Source state is in flight but the target is not reachable from it
    #[error("cannot transition from {from} to {to}")]
    NotAllowed {
        from: RequestStatus,
        to: RequestStatus,
    },

    /// Failed requires a message
    #[error("failure message is required")]
    EmptyFailureMessage,
}

/// Result type alias for intake operations.
pub type Result<T> = std::result::Result<T, IntakeError>;
