//! Submission orchestrator - turns a submitted URL into a cached result,
//! an existing in-flight request, or a new request plus an emitted job.

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::IntakeConfig;
use crate::error::Result;
use crate::service::locks::IdentityLocks;
use crate::traits::{
    emitter::JobEmitter,
    store::{IntakeStore, SaveOutcome},
};
use crate::types::{
    content::ContentRecord,
    job::JobDescription,
    lifecycle::RequestStatus,
    request::{ExtractionRequest, OwnerId, RequestId},
    resource::Resource,
};

/// What a submission resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Fresh content already exists; nothing was written
    Cached(ContentRecord),

    /// A new request was created and its job handed to the emitter
    Pending { request_id: RequestId },

    /// Another request for the same URL is still in flight
    Deduped {
        request_id: RequestId,
        status: RequestStatus,
    },
}

impl SubmitOutcome {
    /// Request the caller should poll, if any.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            SubmitOutcome::Cached(_) => None,
            SubmitOutcome::Pending { request_id } => Some(*request_id),
            SubmitOutcome::Deduped { request_id, .. } => Some(*request_id),
        }
    }
}

/// Entry point for URL submissions.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = SubmissionOrchestrator::new(store, emitter);
///
/// match orchestrator.submit("https://example.com/stew", None).await? {
///     SubmitOutcome::Cached(content) => render(content),
///     SubmitOutcome::Pending { request_id } => poll(request_id),
///     SubmitOutcome::Deduped { request_id, .. } => poll(request_id),
/// }
/// ```
pub struct SubmissionOrchestrator<S: IntakeStore, E: JobEmitter> {
    store: Arc<S>,
    emitter: Arc<E>,
    config: IntakeConfig,
    locks: IdentityLocks,
}

impl<S: IntakeStore, E: JobEmitter> SubmissionOrchestrator<S, E> {
    /// Create an orchestrator with the default configuration.
    pub fn new(store: Arc<S>, emitter: Arc<E>) -> Self {
        Self::with_config(store, emitter, IntakeConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(store: Arc<S>, emitter: Arc<E>, config: IntakeConfig) -> Self {
        Self {
            store,
            emitter,
            config,
            locks: IdentityLocks::new(),
        }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Submit a URL for extraction.
    ///
    /// Checks run in order under a per-identity lock: fresh content, then an
    /// in-flight request, then a new request. A job that cannot be emitted
    /// leaves the new request `Pending` and is still reported as `Pending`.
    pub async fn submit(&self, url: &str, owner: Option<OwnerId>) -> Result<SubmitOutcome> {
        let resource = Resource::from_url(url)?;
        let identity = resource.identity.clone();

        let _guard = self.locks.lock(&identity).await;

        if let Some(content) = self
            .store
            .find_fresh_content(&identity, self.config.content_ttl)
            .await?
        {
            info!(url_hash = %identity, outcome = "cache_hit", "Serving cached content");
            return Ok(SubmitOutcome::Cached(content));
        }

        if let Some(existing) = self.store.find_in_flight_request(&identity).await? {
            info!(
                url_hash = %identity,
                request_id = %existing.id(),
                status = %existing.status(),
                outcome = "dedup",
                "Request already in flight"
            );
            return Ok(deduped(&existing));
        }

        debug!(url_hash = %identity, outcome = "cache_miss", "No fresh content or in-flight request");

        let resource = self.store.save_resource(&resource).await?;
        let request = ExtractionRequest::create(identity.clone(), owner);

        if let SaveOutcome::InFlightExists(existing) = self.store.save_request(&request).await? {
            info!(
                url_hash = %identity,
                request_id = %existing.id(),
                outcome = "dedup",
                "Request created concurrently elsewhere"
            );
            return Ok(deduped(&existing));
        }

        info!(
            url_hash = %identity,
            request_id = %request.id(),
            outcome = "request_created",
            "Created extraction request"
        );

        let job = JobDescription::for_request(&request, resource.raw_url);
        if let Err(e) = self.emitter.emit(&job).await {
            error!(
                url_hash = %identity,
                request_id = %request.id(),
                error = %e,
                "Failed to emit extraction job, request left pending"
            );
        }

        Ok(SubmitOutcome::Pending {
            request_id: request.id(),
        })
    }
}

fn deduped(existing: &ExtractionRequest) -> SubmitOutcome {
    SubmitOutcome::Deduped {
        request_id: existing.id(),
        status: existing.status(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IntakeError, ValidationError};
    use crate::stores::MemoryStore;
    use crate::testing::RecordingJobEmitter;
    use crate::traits::store::RequestStore;
    use crate::types::identity::UrlIdentity;

    fn orchestrator() -> (
        Arc<MemoryStore>,
        Arc<RecordingJobEmitter>,
        SubmissionOrchestrator<MemoryStore, RecordingJobEmitter>,
    ) {
        let store = Arc::new(MemoryStore::new());
        let emitter = Arc::new(RecordingJobEmitter::new());
        let orchestrator = SubmissionOrchestrator::new(Arc::clone(&store), Arc::clone(&emitter));
        (store, emitter, orchestrator)
    }

    #[tokio::test]
    async fn test_blank_url_rejected_without_writes() {
        let (store, emitter, orchestrator) = orchestrator();

        let result = orchestrator.submit("   ", None).await;
        assert!(matches!(
            result,
            Err(IntakeError::Validation(ValidationError::BlankUrl))
        ));
        assert_eq!(store.resource_count(), 0);
        assert_eq!(store.request_count(), 0);
        assert_eq!(emitter.count(), 0);
    }

    #[tokio::test]
    async fn test_job_carries_submitted_url() {
        let (_store, emitter, orchestrator) = orchestrator();

        let outcome = orchestrator
            .submit("  https://Example.com/stew/  ", None)
            .await
            .unwrap();

        let jobs = emitter.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(Some(jobs[0].request_id), outcome.request_id());
        assert_eq!(jobs[0].raw_url, "https://Example.com/stew/");
        assert_eq!(
            jobs[0].identity,
            UrlIdentity::from_url("https://example.com/stew").unwrap()
        );
    }

    #[tokio::test]
    async fn test_owner_recorded_on_request() {
        let (store, _emitter, orchestrator) = orchestrator();
        let owner = OwnerId(uuid::Uuid::new_v4());

        let outcome = orchestrator
            .submit("https://example.com/bread", Some(owner))
            .await
            .unwrap();

        let request_id = outcome.request_id().unwrap();
        let request = store.find_request(request_id).await.unwrap().unwrap();
        assert_eq!(request.owner(), Some(owner));
    }
}
