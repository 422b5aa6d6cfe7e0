//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Result;
use crate::traits::store::{
    ContentStore, IntakeStore, RequestStore, ResourceStore, SaveOutcome, StatusUpdate,
};
use crate::types::{
    content::ContentRecord,
    identity::UrlIdentity,
    request::{ExtractionRequest, RequestId},
    resource::Resource,
};

/// In-memory storage for resources, content and requests.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
pub struct MemoryStore {
    resources: RwLock<HashMap<UrlIdentity, Resource>>,
    contents: RwLock<HashMap<UrlIdentity, ContentRecord>>,
    requests: RwLock<HashMap<RequestId, ExtractionRequest>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            resources: RwLock::new(HashMap::new()),
            contents: RwLock::new(HashMap::new()),
            requests: RwLock::new(HashMap::new()),
        }
    }

    /// Get the number of stored resources.
    pub fn resource_count(&self) -> usize {
        read(&self.resources).len()
    }

    /// Get the number of stored content records.
    pub fn content_count(&self) -> usize {
        read(&self.contents).len()
    }

    /// Get the number of stored requests.
    pub fn request_count(&self) -> usize {
        read(&self.requests).len()
    }

    /// All requests for an identity, oldest first.
    pub fn requests_for(&self, identity: &UrlIdentity) -> Vec<ExtractionRequest> {
        let mut requests: Vec<_> = read(&self.requests)
            .values()
            .filter(|r| r.identity() == identity)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at());
        requests
    }

    /// Store a request as-is, bypassing the in-flight check.
    ///
    /// Lets tests set up states the services never produce.
    pub fn force_request(&self, request: ExtractionRequest) {
        write(&self.requests).insert(request.id(), request);
    }

    fn newest_in_flight(
        requests: &HashMap<RequestId, ExtractionRequest>,
        identity: &UrlIdentity,
    ) -> Option<ExtractionRequest> {
        requests
            .values()
            .filter(|r| r.identity() == identity && r.is_in_flight())
            .max_by_key(|r| (r.created_at(), r.id()))
            .cloned()
    }

    fn apply_update(
        requests: &mut HashMap<RequestId, ExtractionRequest>,
        update: &StatusUpdate,
    ) -> bool {
        let Some(current) = requests.get(&update.id) else {
            return false;
        };
        if current.status() != update.expected {
            return false;
        }

        let updated = ExtractionRequest::reconstitute(
            current.id(),
            current.identity().clone(),
            current.owner(),
            update.status,
            update.error_message.clone(),
            current.created_at(),
            update.updated_at,
        );
        requests.insert(update.id, updated);
        true
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn find_resource(&self, identity: &UrlIdentity) -> Result<Option<Resource>> {
        Ok(read(&self.resources).get(identity).cloned())
    }

    async fn save_resource(&self, resource: &Resource) -> Result<Resource> {
        Ok(write(&self.resources)
            .entry(resource.identity.clone())
            .or_insert_with(|| resource.clone())
            .clone())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn find_content(&self, identity: &UrlIdentity) -> Result<Option<ContentRecord>> {
        Ok(read(&self.contents).get(identity).cloned())
    }

    async fn save_content(&self, content: &ContentRecord) -> Result<()> {
        write(&self.contents).insert(content.identity.clone(), content.clone());
        Ok(())
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn find_request(&self, id: RequestId) -> Result<Option<ExtractionRequest>> {
        Ok(read(&self.requests).get(&id).cloned())
    }

    async fn find_in_flight_request(
        &self,
        identity: &UrlIdentity,
    ) -> Result<Option<ExtractionRequest>> {
        Ok(Self::newest_in_flight(&read(&self.requests), identity))
    }

    async fn save_request(&self, request: &ExtractionRequest) -> Result<SaveOutcome> {
        let mut requests = write(&self.requests);

        if request.is_in_flight() {
            if let Some(existing) = Self::newest_in_flight(&requests, request.identity()) {
                if existing.id() != request.id() {
                    return Ok(SaveOutcome::InFlightExists(existing));
                }
            }
        }

        requests.insert(request.id(), request.clone());
        Ok(SaveOutcome::Saved)
    }

    async fn update_status(&self, update: &StatusUpdate) -> Result<bool> {
        Ok(Self::apply_update(&mut write(&self.requests), update))
    }
}

#[async_trait]
impl IntakeStore for MemoryStore {
    async fn record_completion(
        &self,
        content: &ContentRecord,
        update: &StatusUpdate,
    ) -> Result<bool> {
        let mut requests = write(&self.requests);
        let mut contents = write(&self.contents);

        if !Self::apply_update(&mut requests, update) {
            return Ok(false);
        }
        contents.insert(content.identity.clone(), content.clone());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::lifecycle::RequestStatus;
    use chrono::{Duration, Utc};

    fn identity(url: &str) -> UrlIdentity {
        UrlIdentity::from_url(url).unwrap()
    }

    #[tokio::test]
    async fn test_resource_create_if_absent() {
        let store = MemoryStore::new();
        let first = Resource::from_url("https://example.com/a").unwrap();
        let second = Resource::from_url("https://EXAMPLE.com/a/").unwrap();

        let stored = store.save_resource(&first).await.unwrap();
        assert_eq!(stored.raw_url, "https://example.com/a");

        // Same identity: the first submitter's URL is kept
        let stored = store.save_resource(&second).await.unwrap();
        assert_eq!(stored.raw_url, "https://example.com/a");
        assert_eq!(store.resource_count(), 1);
    }

    #[tokio::test]
    async fn test_content_upsert_and_freshness() {
        let store = MemoryStore::new();
        let id = identity("https://example.com/cake");
        let ttl = Duration::days(30);

        let old = ContentRecord::new(id.clone(), Some("Old".into()), vec![])
            .with_produced_at(Utc::now() - Duration::days(31));
        store.save_content(&old).await.unwrap();

        assert!(store.find_content(&id).await.unwrap().is_some());
        assert!(store.find_fresh_content(&id, ttl).await.unwrap().is_none());

        let new = ContentRecord::new(id.clone(), Some("New".into()), vec![]);
        store.save_content(&new).await.unwrap();

        let fresh = store.find_fresh_content(&id, ttl).await.unwrap().unwrap();
        assert_eq!(fresh.title.as_deref(), Some("New"));
        assert_eq!(store.content_count(), 1);
    }

    #[tokio::test]
    async fn test_second_in_flight_request_refused() {
        let store = MemoryStore::new();
        let id = identity("https://example.com/pie");

        let first = ExtractionRequest::create(id.clone(), None);
        let second = ExtractionRequest::create(id.clone(), None);

        assert_eq!(store.save_request(&first).await.unwrap(), SaveOutcome::Saved);
        assert_eq!(
            store.save_request(&second).await.unwrap(),
            SaveOutcome::InFlightExists(first.clone())
        );
        assert_eq!(store.request_count(), 1);
    }

    #[tokio::test]
    async fn test_new_request_allowed_after_terminal() {
        let store = MemoryStore::new();
        let id = identity("https://example.com/pie");

        let first = ExtractionRequest::create(id.clone(), None);
        store.save_request(&first).await.unwrap();
        let failed = first.mark_failed("timeout").unwrap();
        assert!(store
            .update_status(&StatusUpdate::between(&first, &failed))
            .await
            .unwrap());

        let second = ExtractionRequest::create(id.clone(), None);
        assert_eq!(store.save_request(&second).await.unwrap(), SaveOutcome::Saved);
        assert_eq!(
            store.find_in_flight_request(&id).await.unwrap().map(|r| r.id()),
            Some(second.id())
        );
    }

    #[tokio::test]
    async fn test_in_flight_tie_break_prefers_newest() {
        let store = MemoryStore::new();
        let id = identity("https://example.com/tart");
        let now = Utc::now();

        let older = ExtractionRequest::reconstitute(
            RequestId::new(),
            id.clone(),
            None,
            RequestStatus::Processing,
            None,
            now - Duration::minutes(10),
            now - Duration::minutes(10),
        );
        let newer = ExtractionRequest::reconstitute(
            RequestId::new(),
            id.clone(),
            None,
            RequestStatus::Pending,
            None,
            now,
            now,
        );
        store.force_request(older);
        store.force_request(newer.clone());

        let found = store.find_in_flight_request(&id).await.unwrap().unwrap();
        assert_eq!(found.id(), newer.id());
    }

    #[tokio::test]
    async fn test_update_status_is_conditional() {
        let store = MemoryStore::new();
        let request = ExtractionRequest::create(identity("https://example.com/x"), None);
        store.save_request(&request).await.unwrap();

        let completed = request.mark_completed().unwrap();
        let update = StatusUpdate::between(&request, &completed);

        assert!(store.update_status(&update).await.unwrap());
        // Second application finds the row already Completed
        assert!(!store.update_status(&update).await.unwrap());

        let stored = store.find_request(request.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), RequestStatus::Completed);
    }

    #[tokio::test]
    async fn test_record_completion_skips_content_when_status_moved() {
        let store = MemoryStore::new();
        let id = identity("https://example.com/y");
        let request = ExtractionRequest::create(id.clone(), None);
        store.save_request(&request).await.unwrap();

        let failed = request.mark_failed("gave up").unwrap();
        store
            .update_status(&StatusUpdate::between(&request, &failed))
            .await
            .unwrap();

        let completed = request.mark_completed().unwrap();
        let content = ContentRecord::new(id.clone(), Some("Late".into()), vec![]);
        let applied = store
            .record_completion(&content, &StatusUpdate::between(&request, &completed))
            .await
            .unwrap();

        assert!(!applied);
        assert_eq!(store.content_count(), 0);
    }
}
