//! Event ingestion - applies worker reports to stored requests.
//!
//! Events arrive at least once and possibly out of order. Every status
//! change is a compare-and-set on the status the handler read, so a
//! duplicate or late event never overwrites a newer state.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Result, TransitionError};
use crate::traits::store::{IntakeStore, StatusUpdate};
use crate::types::{
    content::ContentRecord,
    job::{JobOutcome, JobStarted},
    request::ExtractionRequest,
};

/// Stored on a failed request when the worker gave no usable message.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Extraction failed without an error message";

/// Why an event was dropped without any write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// No request with the event's id
    UnknownRequest,
    /// The request's URL has no resource record
    UnknownResource,
}

/// Effect of one ingested event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Content stored and request Completed
    Completed,
    /// Request Failed
    Failed,
    /// Request Processing
    Processing,
    /// Request had already moved past this event; nothing written
    Redelivered,
    /// Event dropped
    Discarded(DiscardReason),
}

pub struct EventIngestion<S: IntakeStore> {
    store: Arc<S>,
}

impl<S: IntakeStore> EventIngestion<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Apply a worker's started notification.
    pub async fn on_job_started(&self, event: JobStarted) -> Result<IngestOutcome> {
        let Some(request) = self.store.find_request(event.request_id).await? else {
            warn!(request_id = %event.request_id, "Started event for unknown request");
            return Ok(IngestOutcome::Discarded(DiscardReason::UnknownRequest));
        };

        let processing = match request.mark_processing() {
            Ok(processing) => processing,
            Err(e) => {
                debug!(
                    request_id = %event.request_id,
                    status = %request.status(),
                    reason = %e,
                    "Ignoring started event"
                );
                return Ok(IngestOutcome::Redelivered);
            }
        };

        if !self.store.update_status(&StatusUpdate::between(&request, &processing)).await? {
            return Ok(redelivered(&request));
        }

        info!(request_id = %event.request_id, "Extraction started");
        Ok(IngestOutcome::Processing)
    }

    /// Apply a worker's finished report.
    pub async fn on_job_outcome(&self, outcome: JobOutcome) -> Result<IngestOutcome> {
        let Some(request) = self.store.find_request(outcome.request_id).await? else {
            warn!(request_id = %outcome.request_id, "Outcome for unknown request");
            return Ok(IngestOutcome::Discarded(DiscardReason::UnknownRequest));
        };

        if outcome.success {
            self.ingest_success(&request, &outcome).await
        } else {
            self.ingest_failure(&request, &outcome).await
        }
    }

    async fn ingest_success(
        &self,
        request: &ExtractionRequest,
        outcome: &JobOutcome,
    ) -> Result<IngestOutcome> {
        if self.store.find_resource(request.identity()).await?.is_none() {
            warn!(
                request_id = %request.id(),
                url_hash = %request.identity(),
                "Resource missing for successful outcome, skipping"
            );
            return Ok(IngestOutcome::Discarded(DiscardReason::UnknownResource));
        }

        let completed = match request.mark_completed() {
            Ok(completed) => completed,
            Err(TransitionError::FromTerminal { .. }) => return Ok(redelivered(request)),
            Err(e) => return Err(e.into()),
        };

        let title = outcome
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        let content = ContentRecord::new(request.identity().clone(), title, outcome.content_items());
        let item_count = content.items.len();

        let update = StatusUpdate::between(request, &completed);
        if !self.store.record_completion(&content, &update).await? {
            return Ok(redelivered(request));
        }

        info!(
            request_id = %request.id(),
            url_hash = %request.identity(),
            items = item_count,
            "Extraction completed"
        );
        Ok(IngestOutcome::Completed)
    }

    async fn ingest_failure(
        &self,
        request: &ExtractionRequest,
        outcome: &JobOutcome,
    ) -> Result<IngestOutcome> {
        let message = outcome
            .error_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_FAILURE_MESSAGE);

        let failed = match request.mark_failed(message) {
            Ok(failed) => failed,
            Err(TransitionError::FromTerminal { .. }) => return Ok(redelivered(request)),
            Err(e) => return Err(e.into()),
        };

        if !self.store.update_status(&StatusUpdate::between(request, &failed)).await? {
            return Ok(redelivered(request));
        }

        info!(
            request_id = %request.id(),
            url_hash = %request.identity(),
            error = %message,
            "Extraction failed"
        );
        Ok(IngestOutcome::Failed)
    }
}

fn redelivered(request: &ExtractionRequest) -> IngestOutcome {
    info!(
        request_id = %request.id(),
        status = %request.status(),
        "Request already settled, ignoring redelivered event"
    );
    IngestOutcome::Redelivered
}
