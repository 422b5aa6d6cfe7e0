//! NATS-backed job emitter.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{IntakeError, Result};
use crate::traits::emitter::JobEmitter;
use crate::types::job::JobDescription;

/// Publishes job descriptions as JSON to a NATS subject.
///
/// `publish` only queues the message on the client, so emission never waits
/// on the worker.
pub struct NatsJobEmitter {
    client: async_nats::Client,
    subject: String,
}

impl NatsJobEmitter {
    pub fn new(client: async_nats::Client, subject: impl Into<String>) -> Self {
        Self {
            client,
            subject: subject.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

fn encode_job(job: &JobDescription) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(job)?))
}

#[async_trait]
impl JobEmitter for NatsJobEmitter {
    async fn emit(&self, job: &JobDescription) -> Result<()> {
        let payload = encode_job(job)?;
        self.client
            .publish(self.subject.clone(), payload)
            .await
            .map_err(IntakeError::emit)?;

        debug!(
            request_id = %job.request_id,
            url_hash = %job.identity,
            subject = %self.subject,
            "Job published"
        );
        Ok(())
    }
}
