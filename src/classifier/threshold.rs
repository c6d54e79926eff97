//! Threshold fallback classifier
//!
//! Critical when any value is strictly above its limit, otherwise Normal.
//! There is no Warning band here.

use async_trait::async_trait;

use super::{ClassifyError, RiskClassifier};
use crate::config::ThresholdConfig;
use crate::types::{RiskTier, SensorReading};

#[derive(Debug, Clone, Default)]
pub struct ThresholdClassifier {
    thresholds: ThresholdConfig,
}

impl ThresholdClassifier {
    pub fn new(thresholds: ThresholdConfig) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    pub fn classify_values(&self, temperature: f64, vibration: f64, gas_level: f64) -> RiskTier {
        let t = &self.thresholds;
        if temperature > t.temperature_critical
            || vibration > t.vibration_critical
            || gas_level > t.gas_level_critical
        {
            RiskTier::Critical
        } else {
            RiskTier::Normal
        }
    }

    pub fn classify_reading(&self, reading: &SensorReading) -> RiskTier {
        self.classify_values(reading.temperature, reading.vibration, reading.gas_level)
    }
}

#[async_trait]
impl RiskClassifier for ThresholdClassifier {
    async fn classify(&self, reading: &SensorReading) -> Result<RiskTier, ClassifyError> {
        Ok(self.classify_reading(reading))
    }

    fn backend_name(&self) -> &'static str {
        "threshold"
    }
}
