//! Outbound job channel to the extraction worker pool.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::job::JobDescription;

/// Hands job descriptions to the external worker.
///
/// Emission is fire-and-forget: implementations must not wait for the job
/// to be processed, only for the message to be accepted.
#[async_trait]
pub trait JobEmitter: Send + Sync {
    async fn emit(&self, job: &JobDescription) -> Result<()>;
}
