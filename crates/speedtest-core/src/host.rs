//! Capabilities the host process provides
//!
//! The host owns user identity, addresses and score storage. The core only sees
//! it through these two traits, passed in as trait objects at construction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::types::MeasurementResult;

/// A user known to the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque identifier carried in invitation tokens
    pub id: String,
    /// Name shown to the speed-test front-end
    pub display_name: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Resolves requesters by their opaque id
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Look up a requester; `Ok(None)` if the id is unknown
    async fn resolve(&self, requester_id: &str) -> Result<Option<Identity>, HostError>;

    /// Current network address of a requester, if connected
    async fn network_address(&self, requester_id: &str) -> Result<Option<String>, HostError>;
}

/// Receives verified results
#[async_trait]
pub trait ScoreSink: Send + Sync {
    /// Record the measurements and provenance status for `result.requester`
    async fn record(&self, result: &MeasurementResult) -> Result<(), HostError>;
}
