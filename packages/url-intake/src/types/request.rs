//! Extraction request - one tracked attempt to extract a URL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{TransitionError, ValidationError};
use crate::types::identity::UrlIdentity;
use crate::types::lifecycle::{LifecycleEvent, RequestStatus};

/// Unique identifier for an extraction request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse a caller-supplied id.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidRequestId {
                value: s.to_string(),
            })
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RequestId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identity of the caller who submitted a URL (absent for guests)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub Uuid);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A tracked extraction attempt.
///
/// Values are immutable: transitions return a new request and leave
/// persisting it to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRequest {
    id: RequestId,
    identity: UrlIdentity,
    owner: Option<OwnerId>,
    status: RequestStatus,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ExtractionRequest {
    /// Create a new request in `Pending`.
    pub fn create(identity: UrlIdentity, owner: Option<OwnerId>) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::new(),
            identity,
            owner,
            status: RequestStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a request loaded from storage.
    pub fn reconstitute(
        id: RequestId,
        identity: UrlIdentity,
        owner: Option<OwnerId>,
        status: RequestStatus,
        error_message: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            identity,
            owner,
            status,
            error_message,
            created_at,
            updated_at,
        }
    }

    /// Apply a lifecycle event, returning the next version of this request.
    pub fn transition(
        &self,
        event: &LifecycleEvent,
        now: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        self.status.validate_transition(event.target())?;

        let error_message = match event {
            LifecycleEvent::Started => None,
            LifecycleEvent::Succeeded => None,
            LifecycleEvent::Failed { message } => {
                if message.trim().is_empty() {
                    return Err(TransitionError::EmptyFailureMessage);
                }
                Some(message.clone())
            }
        };

        Ok(Self {
            status: event.target(),
            error_message,
            updated_at: now,
            ..self.clone()
        })
    }

    pub fn mark_processing(&self) -> Result<Self, TransitionError> {
        self.transition(&LifecycleEvent::Started, Utc::now())
    }

    pub fn mark_completed(&self) -> Result<Self, TransitionError> {
        self.transition(&LifecycleEvent::Succeeded, Utc::now())
    }

    pub fn mark_failed(&self, message: impl Into<String>) -> Result<Self, TransitionError> {
        self.transition(
            &LifecycleEvent::Failed {
                message: message.into(),
            },
            Utc::now(),
        )
    }

    pub fn is_in_flight(&self) -> bool {
        self.status.is_in_flight()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn identity(&self) -> &UrlIdentity {
        &self.identity
    }

    pub fn owner(&self) -> Option<OwnerId> {
        self.owner
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
