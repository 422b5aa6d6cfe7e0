//! URL Intake Library
//!
//! Accepts URLs for content extraction, serves fresh cached results, keeps
//! at most one extraction in flight per URL, and applies the results an
//! external worker reports back.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use url_intake::{EventIngestion, MemoryStore, StatusQuery, SubmissionOrchestrator};
//! use url_intake::testing::RecordingJobEmitter;
//!
//! let store = Arc::new(MemoryStore::new());
//! let emitter = Arc::new(RecordingJobEmitter::new());
//!
//! let orchestrator = SubmissionOrchestrator::new(store.clone(), emitter);
//! let outcome = orchestrator.submit("https://example.com/stew", None).await?;
//!
//! // Later, when the worker reports back
//! let ingestion = EventIngestion::new(store.clone());
//! ingestion.on_job_outcome(outcome_from_worker).await?;
//!
//! let status = StatusQuery::new(store).query(request_id).await?;
//! ```
//!
//! # Modules
//!
//! - [`types`] - Identities, requests, content and worker messages
//! - [`traits`] - Storage and job emitter abstractions
//! - [`stores`] - Storage implementations (MemoryStore, PostgresStore)
//! - [`emitters`] - Job emitter implementations (NatsJobEmitter)
//! - [`service`] - Submission, status and ingestion services
//! - [`testing`] - Emitter doubles for tests

pub mod config;
pub mod emitters;
pub mod error;
pub mod service;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use config::{IntakeConfig, ServiceConfig};
pub use error::{IntakeError, Result, TransitionError, ValidationError};
pub use traits::{
    emitter::JobEmitter,
    store::{ContentStore, IntakeStore, RequestStore, ResourceStore, SaveOutcome, StatusUpdate},
};
pub use types::{
    content::{ContentItem, ContentRecord, DEFAULT_CONTENT_TTL_DAYS},
    identity::{normalize_url, UrlIdentity},
    job::{JobDescription, JobOutcome, JobStarted, ReportedItem},
    lifecycle::{LifecycleEvent, RequestStatus},
    request::{ExtractionRequest, OwnerId, RequestId},
    resource::Resource,
};

// Re-export services
pub use service::{
    Delivery, DiscardReason, EventKind, EventIngestion, IngestOutcome, StatusQuery, StatusResult,
    SubmissionOrchestrator, SubmitOutcome, CONTENT_MISSING_MESSAGE, DEFAULT_FAILURE_MESSAGE,
};

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;

#[cfg(feature = "nats")]
pub use emitters::NatsJobEmitter;
