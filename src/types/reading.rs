//! Reading types: MachineId, RiskTier, SensorReading, Reading

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// Machine Identity
// ============================================================================

/// Opaque machine identifier.
///
/// Only constructed through [`MachineRegistry`](crate::pipeline::MachineRegistry)
/// in production code, which rejects empty and duplicate ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(String);

impl MachineId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MachineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MachineId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// ============================================================================
// Risk Tier
// ============================================================================

/// Severity of a classified reading, ordered Normal < Warning < Critical.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    #[default]
    Normal = 0,
    Warning = 1,
    Critical = 2,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Normal => "normal",
            RiskTier::Warning => "warning",
            RiskTier::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for tier names outside {normal, warning, critical}.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown risk tier '{0}'")]
pub struct UnknownTier(pub String);

impl FromStr for RiskTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(RiskTier::Normal),
            "warning" => Ok(RiskTier::Warning),
            "critical" => Ok(RiskTier::Critical),
            _ => Err(UnknownTier(s.to_string())),
        }
    }
}

// ============================================================================
// Readings
// ============================================================================

/// A raw sensor sample before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub machine_id: MachineId,
    /// Degrees Celsius
    pub temperature: f64,
    /// mm/s
    pub vibration: f64,
    pub gas_level: f64,
    pub timestamp: DateTime<Utc>,
    /// Sequence number of the tick that produced this sample
    pub tick: u64,
}

impl SensorReading {
    /// Attach a risk tier, producing an immutable classified reading.
    pub fn classify_as(self, risk_level: RiskTier) -> Reading {
        Reading {
            machine_id: self.machine_id,
            temperature: self.temperature,
            vibration: self.vibration,
            gas_level: self.gas_level,
            timestamp: self.timestamp,
            tick: self.tick,
            risk_level,
        }
    }
}

/// A classified reading. Fields are read-only once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    machine_id: MachineId,
    temperature: f64,
    vibration: f64,
    gas_level: f64,
    timestamp: DateTime<Utc>,
    tick: u64,
    risk_level: RiskTier,
}

impl Reading {
    pub fn machine_id(&self) -> &MachineId {
        &self.machine_id
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn vibration(&self) -> f64 {
        self.vibration
    }

    pub fn gas_level(&self) -> f64 {
        self.gas_level
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn risk_level(&self) -> RiskTier {
        self.risk_level
    }

    pub fn is_critical(&self) -> bool {
        self.risk_level == RiskTier::Critical
    }
}
