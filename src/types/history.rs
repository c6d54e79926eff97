//! History types: HistoryEntry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Reading, RiskTier};

/// Compact projection of a classified reading kept in the history window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    /// Tick sequence number the reading came from
    pub tick: u64,
    pub temperature: f64,
    pub vibration: f64,
    pub gas_level: f64,
    pub risk_level: RiskTier,
}

impl From<&Reading> for HistoryEntry {
    fn from(reading: &Reading) -> Self {
        Self {
            timestamp: reading.timestamp(),
            tick: reading.tick(),
            temperature: reading.temperature(),
            vibration: reading.vibration(),
            gas_level: reading.gas_level(),
            risk_level: reading.risk_level(),
        }
    }
}
