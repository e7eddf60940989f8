//! Two-layer result verification
//!
//! A callback body is an outer token signed by the web front-end. Inside it,
//! the `token` claim carries the invitation token this service issued. Both
//! layers must verify:
//!
//! 1. The outer signature (web key) proves the web front-end produced the
//!    measurements.
//! 2. The inner signature (plugin key) proves the embedded invitation came from
//!    this service, for a specific requester and address.
//!
//! A mismatch between the invited address and the delivering peer is recorded
//! as a provenance flag, not rejected.

use std::net::IpAddr;
use std::sync::Arc;
use tracing::debug;

use crate::error::{RejectReason, ResultRejected};
use crate::host::IdentityProvider;
use crate::token::{self, claim, Claims, SigningKey};
use crate::types::{addresses_match, MeasurementResult, Metrics};

/// Verifies callback payloads against the web and plugin keys
pub struct ResultVerifier {
    web_key: SigningKey,
    plugin_key: SigningKey,
    identities: Arc<dyn IdentityProvider>,
}

impl ResultVerifier {
    pub fn new(
        web_key: SigningKey,
        plugin_key: SigningKey,
        identities: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            web_key,
            plugin_key,
            identities,
        }
    }

    /// Verify a raw callback body delivered from `observed`
    pub async fn verify(
        &self,
        body: &str,
        observed: IpAddr,
    ) -> Result<MeasurementResult, ResultRejected> {
        // Step 1: outer token, web key
        let outer = token::verify(body, &self.web_key).map_err(RejectReason::OuterSignature)?;

        // Step 2: embedded invitation, plugin key
        let inner_token = outer
            .get_str(claim::TOKEN)
            .ok_or(RejectReason::MissingClaim(claim::TOKEN))?;
        let inner =
            token::verify(inner_token, &self.plugin_key).map_err(RejectReason::InnerSignature)?;

        // Step 3: measurements
        let metrics = Metrics {
            down: metric(&outer, claim::DOWN)?,
            up: metric(&outer, claim::UP)?,
            ping: metric(&outer, claim::PING)?,
            jitter: metric(&outer, claim::JITTER)?,
        };

        // Step 4: invitation claims
        let claimed_address = inner
            .get_str(claim::NETWORK_ADDRESS)
            .ok_or(RejectReason::MissingClaim(claim::NETWORK_ADDRESS))?;
        let requester_id = inner
            .get_str(claim::REQUESTER_ID)
            .ok_or(RejectReason::MissingClaim(claim::REQUESTER_ID))?;

        // Step 5: requester must be known to the host
        let requester = self
            .identities
            .resolve(requester_id)
            .await
            .map_err(|e| RejectReason::Host(e.to_string()))?
            .ok_or_else(|| RejectReason::UnknownRequester(requester_id.to_string()))?;

        // Step 6: provenance flag
        let address_matched = addresses_match(claimed_address, observed);

        debug!(
            requester = %requester.id,
            claimed = %claimed_address,
            observed = %observed,
            address_matched,
            "Verified result chain"
        );

        Ok(MeasurementResult {
            requester,
            claimed_address: claimed_address.to_string(),
            observed_address: observed,
            metrics,
            address_matched,
        })
    }
}

fn metric(claims: &Claims, name: &'static str) -> Result<f64, RejectReason> {
    claims.get_f64(name).ok_or(RejectReason::MissingMetric(name))
}
