//! Storage traits for resources, content records and requests.
//!
//! The storage layer is split into focused traits:
//! - `ResourceStore`: identity → original URL
//! - `ContentStore`: cached extraction results
//! - `RequestStore`: extraction request lifecycle rows
//! - `IntakeStore`: composite trait used by the services

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::types::{
    content::ContentRecord,
    identity::UrlIdentity,
    lifecycle::RequestStatus,
    request::{ExtractionRequest, RequestId},
    resource::Resource,
};

/// Store for known URLs.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Get the resource for an identity.
    async fn find_resource(&self, identity: &UrlIdentity) -> Result<Option<Resource>>;

    /// Create the resource if none exists for its identity.
    ///
    /// Returns the stored record; an existing record wins over `resource`.
    async fn save_resource(&self, resource: &Resource) -> Result<Resource>;
}

/// Store for cached extraction results.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Get the content record for an identity, fresh or not.
    async fn find_content(&self, identity: &UrlIdentity) -> Result<Option<ContentRecord>>;

    /// Get the content record only if it is younger than `ttl`.
    async fn find_fresh_content(
        &self,
        identity: &UrlIdentity,
        ttl: Duration,
    ) -> Result<Option<ContentRecord>> {
        self.find_fresh_content_at(identity, ttl, Utc::now()).await
    }

    /// Get the content record only if it was produced less than `ttl` before `now`.
    async fn find_fresh_content_at(
        &self,
        identity: &UrlIdentity,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Option<ContentRecord>> {
        Ok(self
            .find_content(identity)
            .await?
            .filter(|content| content.is_fresh_at(ttl, now)))
    }

    /// Insert or overwrite the content record for its identity.
    async fn save_content(&self, content: &ContentRecord) -> Result<()>;
}

/// Result of inserting a new request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Request stored
    Saved,
    /// Request not stored: another in-flight request already owns the identity
    InFlightExists(ExtractionRequest),
}

/// Conditional status change for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub id: RequestId,
    /// Status the row must still have for the update to apply
    pub expected: RequestStatus,
    pub status: RequestStatus,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StatusUpdate {
    /// Update that moves `before` to the state held by `after`.
    pub fn between(before: &ExtractionRequest, after: &ExtractionRequest) -> Self {
        Self {
            id: after.id(),
            expected: before.status(),
            status: after.status(),
            error_message: after.error_message().map(str::to_string),
            updated_at: after.updated_at(),
        }
    }
}

/// Store for extraction requests.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// Get a request by id.
    async fn find_request(&self, id: RequestId) -> Result<Option<ExtractionRequest>>;

    /// Get the newest Pending or Processing request for an identity.
    async fn find_in_flight_request(
        &self,
        identity: &UrlIdentity,
    ) -> Result<Option<ExtractionRequest>>;

    /// Insert a new request.
    ///
    /// Implementations must refuse a second in-flight request for the same
    /// identity and report the existing one instead.
    async fn save_request(&self, request: &ExtractionRequest) -> Result<SaveOutcome>;

    /// Apply a status change if the row still has `update.expected`.
    ///
    /// Returns `false` if the row was missing or had moved on.
    async fn update_status(&self, update: &StatusUpdate) -> Result<bool>;
}

/// Composite storage trait used by the intake services.
#[async_trait]
pub trait IntakeStore: ResourceStore + ContentStore + RequestStore {
    /// Upsert content and complete its request as one unit.
    ///
    /// Returns the `update_status` result. The default runs the two writes
    /// back to back; transactional backends override it.
    async fn record_completion(
        &self,
        content: &ContentRecord,
        update: &StatusUpdate,
    ) -> Result<bool> {
        self.save_content(content).await?;
        self.update_status(update).await
    }
}
