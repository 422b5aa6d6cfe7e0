//! Request lifecycle states and the transition table.
//!
//! ```text
//! Pending ──► Processing ──► Completed
//!    │             │
//!    │             └───────► Failed
//!    ├──────────────────────► Completed
//!    └──────────────────────► Failed
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TransitionError;

/// Lifecycle state of an extraction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Created and job emitted, waiting for a worker
    #[default]
    Pending,
    /// A worker picked the job up
    Processing,
    /// Extraction succeeded; content is available
    Completed,
    /// Extraction failed; an error message is available
    Failed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 4] = [
        RequestStatus::Pending,
        RequestStatus::Processing,
        RequestStatus::Completed,
        RequestStatus::Failed,
    ];

    /// Pending or Processing.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::Processing)
    }

    /// Completed or Failed. No transitions leave a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }

    /// Check whether `self -> target` is a legal move.
    pub fn validate_transition(self, target: RequestStatus) -> Result<(), TransitionError> {
        use RequestStatus::*;

        if self.is_terminal() {
            return Err(TransitionError::FromTerminal {
                from: self,
                to: target,
            });
        }

        match (self, target) {
            (Pending, Processing) | (Pending, Completed) | (Pending, Failed) => Ok(()),
            (Processing, Completed) | (Processing, Failed) => Ok(()),
            _ => Err(TransitionError::NotAllowed {
                from: self,
                to: target,
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processing => "processing",
            RequestStatus::Completed => "completed",
            RequestStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "processing" => Ok(RequestStatus::Processing),
            "completed" => Ok(RequestStatus::Completed),
            "failed" => Ok(RequestStatus::Failed),
            other => Err(format!("unknown request status: {}", other)),
        }
    }
}

/// Something that happened to a request's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Worker picked the job up
    Started,
    /// Worker reported success
    Succeeded,
    /// Worker reported failure
    Failed { message: String },
}

impl LifecycleEvent {
    /// Status this event moves a request into.
    pub fn target(&self) -> RequestStatus {
        match self {
            LifecycleEvent::Started => RequestStatus::Processing,
            LifecycleEvent::Succeeded => RequestStatus::Completed,
            LifecycleEvent::Failed { .. } => RequestStatus::Failed,
        }
    }
}
