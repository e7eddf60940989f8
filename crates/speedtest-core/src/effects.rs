//! Gameplay effect tiers derived from recorded scores
//!
//! The host applies these periodically to every online user with a recorded
//! score, while the effect switch is on. Levels are zero-based amplifiers.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Integer scores as stored by the scoreboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedScores {
    pub down: Option<i64>,
    pub up: Option<i64>,
    pub ping: Option<i64>,
}

/// An effect and its amplifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "effect", content = "level", rename_all = "snake_case")]
pub enum Effect {
    Speed(u32),
    Slowness(u32),
    Jump(u32),
    MiningFatigue(u32),
}

/// Downloads above this always get the top speed tier
const DOWN_CAP_MBPS: i64 = 1300;
const DOWN_CAP_TIER: i64 = 30;
const PING_FATIGUE_MS: i64 = 40;

fn curve(x: f64, offset: f64) -> i64 {
    (0.7444 * x.powi(3) - 0.0614 * x.powi(2) + 1.5959 * x + offset) as i64
}

/// Speed or slowness from download speed; negative speeds count as zero
pub fn download_effect(down: i64) -> Option<Effect> {
    let down = down.max(0);
    let tier = if down > DOWN_CAP_MBPS {
        DOWN_CAP_TIER
    } else {
        curve(((down + 1) as f64).log10(), -5.0349)
    };

    match tier {
        t if t > 0 => Some(Effect::Speed((t - 1) as u32)),
        t if t < 0 => Some(Effect::Slowness((-t - 1) as u32)),
        _ => None,
    }
}

/// Jump boost from upload speed; negative speeds count as zero
pub fn upload_effect(up: i64) -> Option<Effect> {
    let up = up.max(0);
    let tier = curve(((up / 2 + 1) as f64).log10(), -1.0);
    (tier > 0).then(|| Effect::Jump((tier - 1) as u32))
}

/// Mining fatigue from latency; always applied once a ping is recorded
pub fn ping_effect(ping: i64) -> Effect {
    Effect::MiningFatigue(if ping > PING_FATIGUE_MS { 1 } else { 0 })
}

/// All effects for a user's scores
pub fn effects_for(scores: &RecordedScores) -> Vec<Effect> {
    let mut effects = Vec::new();
    effects.extend(scores.down.and_then(download_effect));
    effects.extend(scores.up.and_then(upload_effect));
    effects.extend(scores.ping.map(ping_effect));
    effects
}

/// Admin toggle for effect application; off until turned on
#[derive(Debug, Default)]
pub struct EffectSwitch(AtomicBool);

impl EffectSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Effects for `scores`, or none while switched off
    pub fn effects_for(&self, scores: &RecordedScores) -> Vec<Effect> {
        if self.is_enabled() {
            effects_for(scores)
        } else {
            Vec::new()
        }
    }
}
