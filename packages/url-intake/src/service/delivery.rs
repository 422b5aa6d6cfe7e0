//! Acknowledgement decisions for raw worker messages.
//!
//! A message is acknowledged once it has been applied or can never be
//! applied. Storage errors leave it for redelivery.

use tracing::{debug, error, warn};

use super::ingest::EventIngestion;
use crate::traits::store::IntakeStore;
use crate::types::job::{JobOutcome, JobStarted};

/// Which worker report a payload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Started,
    Outcome,
}

/// What the transport should do with a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Applied, or permanently unusable
    Ack,
    /// Not applied; deliver again later
    Retry,
}

impl<S: IntakeStore> EventIngestion<S> {
    /// Decode one payload, apply it, and decide how to acknowledge it.
    pub async fn apply_payload(&self, kind: EventKind, payload: &[u8]) -> Delivery {
        match kind {
            EventKind::Started => {
                let event: JobStarted = match serde_json::from_slice(payload) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "Malformed started event, dropping");
                        return Delivery::Ack;
                    }
                };
                let request_id = event.request_id;
                match self.on_job_started(event).await {
                    Ok(result) => {
                        debug!(request_id = %request_id, result = ?result, "Started event applied");
                        Delivery::Ack
                    }
                    Err(e) => {
                        error!(request_id = %request_id, error = %e, "Failed to apply started event");
                        Delivery::Retry
                    }
                }
            }
            EventKind::Outcome => {
                let outcome: JobOutcome = match serde_json::from_slice(payload) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(error = %e, "Malformed outcome event, dropping");
                        return Delivery::Ack;
                    }
                };
                let request_id = outcome.request_id;
                match self.on_job_outcome(outcome).await {
                    Ok(result) => {
                        debug!(request_id = %request_id, result = ?result, "Outcome applied");
                        Delivery::Ack
                    }
                    Err(e) => {
                        error!(request_id = %request_id, error = %e, "Failed to apply outcome");
                        Delivery::Retry
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Arc;

    use crate::error::{IntakeError, Result};
    use crate::stores::MemoryStore;
    use crate::traits::store::{
        ContentStore, RequestStore, ResourceStore, SaveOutcome, StatusUpdate,
    };
    use crate::types::{
        content::ContentRecord,
        identity::UrlIdentity,
        lifecycle::RequestStatus,
        request::{ExtractionRequest, RequestId},
        resource::Resource,
    };

    /// Store whose every call fails, as when the database is down.
    struct UnavailableStore;

    fn unavailable<T>() -> Result<T> {
        Err(IntakeError::storage("connection refused"))
    }

    #[async_trait]
    impl ResourceStore for UnavailableStore {
        async fn find_resource(&self, _identity: &UrlIdentity) -> Result<Option<Resource>> {
            unavailable()
        }

        async fn save_resource(&self, _resource: &Resource) -> Result<Resource> {
            unavailable()
        }
    }

    #[async_trait]
    impl ContentStore for UnavailableStore {
        async fn find_content(&self, _identity: &UrlIdentity) -> Result<Option<ContentRecord>> {
            unavailable()
        }

        async fn save_content(&self, _content: &ContentRecord) -> Result<()> {
            unavailable()
        }
    }

    #[async_trait]
    impl RequestStore for UnavailableStore {
        async fn find_request(&self, _id: RequestId) -> Result<Option<ExtractionRequest>> {
            unavailable()
        }

        async fn find_in_flight_request(
            &self,
            _identity: &UrlIdentity,
        ) -> Result<Option<ExtractionRequest>> {
            unavailable()
        }

        async fn save_request(&self, _request: &ExtractionRequest) -> Result<SaveOutcome> {
            unavailable()
        }

        async fn update_status(&self, _update: &StatusUpdate) -> Result<bool> {
            unavailable()
        }
    }

    impl IntakeStore for UnavailableStore {}

    async fn seeded(url: &str) -> (Arc<MemoryStore>, ExtractionRequest) {
        let store = Arc::new(MemoryStore::new());
        let resource = Resource::from_url(url).unwrap();
        store.save_resource(&resource).await.unwrap();
        let request = ExtractionRequest::create(resource.identity, None);
        store.save_request(&request).await.unwrap();
        (store, request)
    }

    #[tokio::test]
    async fn test_applied_outcome_is_acked() {
        let (store, request) = seeded("https://example.com/soup").await;
        let ingestion = EventIngestion::new(Arc::clone(&store));
        let payload = serde_json::to_vec(&JobOutcome::succeeded(request.id(), "Soup", vec![])).unwrap();

        assert_eq!(ingestion.apply_payload(EventKind::Outcome, &payload).await, Delivery::Ack);
        let stored = store.find_request(request.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), RequestStatus::Completed);

        // A redelivery changes nothing and is still acked
        assert_eq!(ingestion.apply_payload(EventKind::Outcome, &payload).await, Delivery::Ack);
        assert!(store.find_fresh_content(request.identity(), Duration::days(1)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_started_event_is_acked() {
        let (store, request) = seeded("https://example.com/stew").await;
        let ingestion = EventIngestion::new(Arc::clone(&store));
        let payload = serde_json::to_vec(&JobStarted {
            request_id: request.id(),
        })
        .unwrap();

        assert_eq!(ingestion.apply_payload(EventKind::Started, &payload).await, Delivery::Ack);
        let stored = store.find_request(request.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), RequestStatus::Processing);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_acked() {
        let ingestion = EventIngestion::new(Arc::new(MemoryStore::new()));

        assert_eq!(ingestion.apply_payload(EventKind::Outcome, b"{not json").await, Delivery::Ack);
        assert_eq!(
            ingestion.apply_payload(EventKind::Started, br#"{"request_id":"nope"}"#).await,
            Delivery::Ack
        );
    }

    #[tokio::test]
    async fn test_unknown_request_is_acked() {
        let ingestion = EventIngestion::new(Arc::new(MemoryStore::new()));
        let payload = serde_json::to_vec(&JobOutcome::failed(RequestId::new(), "gone")).unwrap();

        assert_eq!(ingestion.apply_payload(EventKind::Outcome, &payload).await, Delivery::Ack);
    }

    #[tokio::test]
    async fn test_storage_error_is_retried() {
        let ingestion = EventIngestion::new(Arc::new(UnavailableStore));
        let outcome = serde_json::to_vec(&JobOutcome::failed(RequestId::new(), "boom")).unwrap();
        let started = serde_json::to_vec(&JobStarted {
            request_id: RequestId::new(),
        })
        .unwrap();

        assert_eq!(ingestion.apply_payload(EventKind::Outcome, &outcome).await, Delivery::Retry);
        assert_eq!(ingestion.apply_payload(EventKind::Started, &started).await, Delivery::Retry);
    }
}
