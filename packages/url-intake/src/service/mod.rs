//! Intake services: submission, status lookup and event ingestion.

pub mod delivery;
pub mod ingest;
pub mod locks;
pub mod status;
pub mod submit;

pub use delivery::{Delivery, EventKind};
pub use ingest::{DiscardReason, EventIngestion, IngestOutcome, DEFAULT_FAILURE_MESSAGE};
pub use locks::IdentityLocks;
pub use status::{StatusQuery, StatusResult, CONTENT_MISSING_MESSAGE};
pub use submit::{SubmissionOrchestrator, SubmitOutcome};
