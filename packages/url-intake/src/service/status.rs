//! Read-only status lookups for extraction requests.

use std::sync::Arc;
use tracing::error;

use crate::error::Result;
use crate::traits::store::IntakeStore;
use crate::types::{
    content::ContentRecord,
    lifecycle::RequestStatus,
    request::{ExtractionRequest, RequestId},
};

/// Reported when a request is Completed but its content is gone.
pub const CONTENT_MISSING_MESSAGE: &str = "Content not found after completion";

/// Caller-facing view of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResult {
    pub request_id: RequestId,
    pub status: RequestStatus,
    /// Set when `status` is `Failed`
    pub error_message: Option<String>,
    /// Set when `status` is `Completed`
    pub content: Option<ContentRecord>,
}

impl StatusResult {
    fn in_flight(request: &ExtractionRequest) -> Self {
        Self {
            request_id: request.id(),
            status: request.status(),
            error_message: None,
            content: None,
        }
    }

    fn failed(request_id: RequestId, message: impl Into<String>) -> Self {
        Self {
            request_id,
            status: RequestStatus::Failed,
            error_message: Some(message.into()),
            content: None,
        }
    }
}

pub struct StatusQuery<S: IntakeStore> {
    store: Arc<S>,
}

impl<S: IntakeStore> StatusQuery<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Look up a request by a caller-supplied id string.
    pub async fn query_str(&self, request_id: &str) -> Result<Option<StatusResult>> {
        let request_id = RequestId::parse(request_id)?;
        self.query(request_id).await
    }

    /// Look up a request. `None` means no such request.
    pub async fn query(&self, request_id: RequestId) -> Result<Option<StatusResult>> {
        let Some(request) = self.store.find_request(request_id).await? else {
            return Ok(None);
        };

        let result = match request.status() {
            RequestStatus::Pending | RequestStatus::Processing => StatusResult::in_flight(&request),
            RequestStatus::Failed => StatusResult::failed(
                request_id,
                request.error_message().unwrap_or_default().to_string(),
            ),
            RequestStatus::Completed => {
                match self.store.find_content(request.identity()).await? {
                    Some(content) => StatusResult {
                        request_id,
                        status: RequestStatus::Completed,
                        error_message: None,
                        content: Some(content),
                    },
                    None => {
                        error!(
                            request_id = %request_id,
                            url_hash = %request.identity(),
                            "Completed request has no content"
                        );
                        StatusResult::failed(request_id, CONTENT_MISSING_MESSAGE)
                    }
                }
            }
        };

        Ok(Some(result))
    }
}
