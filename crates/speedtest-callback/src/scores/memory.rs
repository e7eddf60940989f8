//! In-memory scoreboard
//!
//! Development host: knows a fixed set of identities, keeps the latest row per
//! requester and every delivery in order. Data is lost on restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;

use speedtest_core::{
    Effect, EffectSwitch, HostError, Identity, IdentityProvider, MeasurementResult, ScoreSink,
};

use super::ScoreRow;

#[derive(Debug, Clone)]
struct Member {
    identity: Identity,
    address: Option<String>,
}

#[derive(Debug, Default)]
pub struct MemoryScoreboard {
    members: RwLock<HashMap<String, Member>>,
    scores: RwLock<HashMap<String, ScoreRow>>,
    deliveries: RwLock<Vec<MeasurementResult>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, HostError> {
    lock.read()
        .map_err(|_| HostError::Storage("scoreboard lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, HostError> {
    lock.write()
        .map_err(|_| HostError::Storage("scoreboard lock poisoned".into()))
}

impl MemoryScoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a known requester
    pub fn register(&self, identity: Identity, address: Option<String>) -> Result<(), HostError> {
        info!(id = %identity.id, address = ?address, "Registering requester");
        write(&self.members)?.insert(identity.id.clone(), Member { identity, address });
        Ok(())
    }

    /// Update a requester's current address; `None` when they disconnect
    pub fn set_address(&self, id: &str, address: Option<String>) -> Result<(), HostError> {
        let mut members = write(&self.members)?;
        let member = members
            .get_mut(id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;
        member.address = address;
        Ok(())
    }

    pub fn scores(&self, id: &str) -> Result<Option<ScoreRow>, HostError> {
        Ok(read(&self.scores)?.get(id).cloned())
    }

    /// Every accepted result, oldest first
    pub fn history(&self) -> Result<Vec<MeasurementResult>, HostError> {
        Ok(read(&self.deliveries)?.clone())
    }

    pub fn delivery_count(&self) -> Result<usize, HostError> {
        Ok(read(&self.deliveries)?.len())
    }

    /// Effects to apply to `id` right now; empty while the switch is off
    pub fn effects_for(&self, id: &str, switch: &EffectSwitch) -> Result<Vec<Effect>, HostError> {
        Ok(self
            .scores(id)?
            .map(|row| switch.effects_for(&row.recorded()))
            .unwrap_or_default())
    }
}

#[async_trait]
impl IdentityProvider for MemoryScoreboard {
    async fn resolve(&self, requester_id: &str) -> Result<Option<Identity>, HostError> {
        Ok(read(&self.members)?
            .get(requester_id)
            .map(|m| m.identity.clone()))
    }

    async fn network_address(&self, requester_id: &str) -> Result<Option<String>, HostError> {
        Ok(read(&self.members)?
            .get(requester_id)
            .and_then(|m| m.address.clone()))
    }
}

#[async_trait]
impl ScoreSink for MemoryScoreboard {
    async fn record(&self, result: &MeasurementResult) -> Result<(), HostError> {
        let row = ScoreRow::from_result(result);
        info!(
            id = %result.requester.id,
            down = row.down,
            up = row.up,
            ping = row.ping,
            jitter = row.jitter,
            done = row.done,
            "Recording scores"
        );

        write(&self.scores)?.insert(result.requester.id.clone(), row);
        write(&self.deliveries)?.push(result.clone());
        Ok(())
    }
}
