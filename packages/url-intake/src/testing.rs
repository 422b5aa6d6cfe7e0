//! Testing utilities including job emitter doubles.
//!
//! These let applications exercise the intake services without a running
//! message broker.

use async_trait::async_trait;
use std::sync::RwLock;

use crate::error::{IntakeError, Result};
use crate::traits::emitter::JobEmitter;
use crate::types::{job::JobDescription, request::RequestId};

/// Emitter that records every job it is handed.
#[derive(Default)]
pub struct RecordingJobEmitter {
    jobs: RwLock<Vec<JobDescription>>,
}

impl RecordingJobEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// All emitted jobs, in emission order.
    pub fn jobs(&self) -> Vec<JobDescription> {
        self.jobs.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of emitted jobs.
    pub fn count(&self) -> usize {
        self.jobs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Jobs emitted for one request.
    pub fn jobs_for(&self, request_id: RequestId) -> Vec<JobDescription> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|job| job.request_id == request_id)
            .cloned()
            .collect()
    }

    /// Clear recorded jobs.
    pub fn clear(&self) {
        self.jobs.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

#[async_trait]
impl JobEmitter for RecordingJobEmitter {
    async fn emit(&self, job: &JobDescription) -> Result<()> {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(job.clone());
        Ok(())
    }
}

/// Emitter whose every call fails, counting the attempts.
#[derive(Default)]
pub struct FailingJobEmitter {
    attempts: RwLock<usize>,
}

impl FailingJobEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of emission attempts so far.
    pub fn attempts(&self) -> usize {
        *self.attempts.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl JobEmitter for FailingJobEmitter {
    async fn emit(&self, job: &JobDescription) -> Result<()> {
        *self.attempts.write().unwrap_or_else(|e| e.into_inner()) += 1;
        Err(IntakeError::emit(format!(
            "broker unavailable for request {}",
            job.request_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::identity::UrlIdentity;
    use crate::types::request::ExtractionRequest;

    fn job() -> JobDescription {
        let identity = UrlIdentity::from_url("https://example.com/pho").unwrap();
        let request = ExtractionRequest::create(identity, None);
        JobDescription::for_request(&request, "https://example.com/pho")
    }

    #[tokio::test]
    async fn test_recording_emitter() {
        let emitter = RecordingJobEmitter::new();
        let job = job();

        emitter.emit(&job).await.unwrap();

        assert_eq!(emitter.count(), 1);
        assert_eq!(emitter.jobs_for(job.request_id), vec![job]);

        emitter.clear();
        assert_eq!(emitter.count(), 0);
    }

    #[tokio::test]
    async fn test_failing_emitter() {
        let emitter = FailingJobEmitter::new();

        let result = emitter.emit(&job()).await;
        assert!(matches!(result, Err(IntakeError::Emit(_))));
        assert_eq!(emitter.attempts(), 1);
    }
}
