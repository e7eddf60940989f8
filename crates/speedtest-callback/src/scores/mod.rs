//! Score storage
//!
//! Scores are stored the way the host's player data holds them: integer
//! megabits and milliseconds, plus a `done` marker that records how the result
//! arrived (1 = from the invited address, 2 = relayed from elsewhere).

mod memory;

pub use memory::MemoryScoreboard;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use speedtest_core::{MeasurementResult, RecordedScores};

/// One requester's latest scores
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub down: i64,
    pub up: i64,
    pub ping: i64,
    pub jitter: i64,
    /// Provenance score of the result that wrote this row
    pub done: i64,
    pub recorded_at: DateTime<Utc>,
}

impl ScoreRow {
    /// Measurements are truncated toward zero
    pub fn from_result(result: &MeasurementResult) -> Self {
        let m = &result.metrics;
        Self {
            down: m.down as i64,
            up: m.up as i64,
            ping: m.ping as i64,
            jitter: m.jitter as i64,
            done: result.status().score(),
            recorded_at: Utc::now(),
        }
    }

    pub fn recorded(&self) -> RecordedScores {
        RecordedScores {
            down: Some(self.down),
            up: Some(self.up),
            ping: Some(self.ping),
        }
    }
}
