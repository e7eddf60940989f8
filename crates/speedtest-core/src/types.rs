//! Measurement results handed to the host

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::host::Identity;

/// The four measurements reported by the speed-test front-end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Download speed (Mbps)
    pub down: f64,
    /// Upload speed (Mbps)
    pub up: f64,
    /// Latency (ms)
    pub ping: f64,
    /// Latency jitter (ms)
    pub jitter: f64,
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Down: {} Mbps, Up: {} Mbps, Ping: {} ms, Jitter: {} ms",
            self.down, self.up, self.ping, self.jitter
        )
    }
}

/// Whether the result arrived from the address the invitation was issued to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvenanceStatus {
    /// Delivered from the invited address
    Matched,
    /// Delivered from elsewhere (NAT, proxy, another machine)
    Relayed,
}

impl ProvenanceStatus {
    /// Value stored in the "done" objective
    pub fn score(self) -> i64 {
        match self {
            ProvenanceStatus::Matched => 1,
            ProvenanceStatus::Relayed => 2,
        }
    }
}

impl fmt::Display for ProvenanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvenanceStatus::Matched => write!(f, "matched"),
            ProvenanceStatus::Relayed => write!(f, "relayed"),
        }
    }
}

/// A verified speed-test result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    /// Requester resolved from the invitation token
    pub requester: Identity,

    /// Address recorded in the invitation token
    pub claimed_address: String,

    /// Peer address of the connection that delivered the callback
    pub observed_address: IpAddr,

    pub metrics: Metrics,

    /// `claimed_address` equals `observed_address`
    pub address_matched: bool,
}

impl MeasurementResult {
    pub fn status(&self) -> ProvenanceStatus {
        if self.address_matched {
            ProvenanceStatus::Matched
        } else {
            ProvenanceStatus::Relayed
        }
    }
}

/// Compare an address claim with the observed peer
///
/// IPv4-mapped IPv6 peers compare equal to their IPv4 form. A claim that is not
/// an IP literal falls back to string comparison.
pub fn addresses_match(claimed: &str, observed: IpAddr) -> bool {
    match claimed.parse::<IpAddr>() {
        Ok(ip) => ip.to_canonical() == observed.to_canonical(),
        Err(_) => claimed == observed.to_string(),
    }
}
