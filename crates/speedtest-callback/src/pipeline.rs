//! Submission pipeline: verify a callback body, then record it

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;

use speedtest_core::{ResultVerifier, ScoreSink};

use crate::error::SubmissionError;

/// What the router calls for a `POST /` body
///
/// The router only knows this capability, never the host behind it.
#[async_trait]
pub trait SubmissionHandler: Send + Sync {
    /// Accept or reject a UTF-8 callback body delivered from `peer`
    async fn submit(&self, payload: &str, peer: IpAddr) -> Result<(), SubmissionError>;
}

/// Verifies results and hands them to the host's score sink
pub struct ResultPipeline {
    verifier: ResultVerifier,
    sink: Arc<dyn ScoreSink>,
}

impl ResultPipeline {
    pub fn new(verifier: ResultVerifier, sink: Arc<dyn ScoreSink>) -> Self {
        Self { verifier, sink }
    }
}

#[async_trait]
impl SubmissionHandler for ResultPipeline {
    async fn submit(&self, payload: &str, peer: IpAddr) -> Result<(), SubmissionError> {
        let result = self.verifier.verify(payload, peer).await?;

        info!(
            ip = %result.claimed_address,
            uuid = %result.requester.id,
            remote_ip = %result.observed_address,
            status = %result.status(),
            "{}",
            result.metrics
        );

        self.sink.record(&result).await?;
        Ok(())
    }
}
