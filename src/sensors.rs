//! Sensor reading ingestion
//!
//! [`ReadingSource`] abstracts where samples come from. The built-in
//! [`SyntheticSource`] draws uniform random values; a deployment wired to a
//! real sensor bus provides its own implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{defaults::GENERATOR_DECIMALS, GeneratorConfig};
use crate::types::{MachineId, SensorReading};

/// A source could not produce a sample for one machine.
#[derive(Debug, thiserror::Error)]
#[error("no sample for {machine}: {reason}")]
pub struct SourceError {
    pub machine: MachineId,
    pub reason: String,
}

/// Trait abstracting where sensor samples come from.
///
/// Called once per registered machine per tick, in registration order.
#[async_trait]
pub trait ReadingSource: Send {
    /// Produce the sample for `machine` on tick `tick`, stamped `at`.
    async fn next_reading(
        &mut self,
        machine: &MachineId,
        tick: u64,
        at: DateTime<Utc>,
    ) -> Result<SensorReading, SourceError>;

    /// Human-readable name for logging.
    fn source_name(&self) -> &str;
}

// ============================================================================
// Synthetic Source
// ============================================================================

/// Uniform random readings within the configured ranges.
pub struct SyntheticSource {
    ranges: GeneratorConfig,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(ranges: GeneratorConfig) -> Self {
        Self {
            ranges,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for tests and replays.
    pub fn with_seed(ranges: GeneratorConfig, seed: u64) -> Self {
        Self {
            ranges,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw one sample. Infallible.
    pub fn generate(&mut self, machine: &MachineId, tick: u64, at: DateTime<Utc>) -> SensorReading {
        SensorReading {
            machine_id: machine.clone(),
            temperature: self.draw(self.ranges.temperature),
            vibration: self.draw(self.ranges.vibration),
            gas_level: self.draw(self.ranges.gas_level),
            timestamp: at,
            tick,
        }
    }

    fn draw(&mut self, (low, high): (f64, f64)) -> f64 {
        if high <= low {
            return round_to(low, GENERATOR_DECIMALS);
        }
        // Rounding may step past a bound with more than two decimals
        round_to(self.rng.gen_range(low..=high), GENERATOR_DECIMALS).clamp(low, high)
    }
}

#[async_trait]
impl ReadingSource for SyntheticSource {
    async fn next_reading(
        &mut self,
        machine: &MachineId,
        tick: u64,
        at: DateTime<Utc>,
    ) -> Result<SensorReading, SourceError> {
        Ok(self.generate(machine, tick, at))
    }

    fn source_name(&self) -> &str {
        "synthetic"
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
