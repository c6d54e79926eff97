//! Insight Engine
//!
//! Derives a short diagnostic summary and recommendations from the latest
//! classified readings and the history window. Pure: calling it any number
//! of times per tick changes nothing.
//!
//! Summary lines, in order:
//! 1. average temperature, max temperature, average vibration
//!    (omitted when no machine has a reading)
//! 2. exactly one of: critical machines, warning machines, or no risks
//! 3. temperature spikes, only if any were found
//!
//! Recommendations are gated independently; when none fire a generic
//! monitoring recommendation is emitted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::config::InsightConfig;
use crate::history_storage::HistoryStore;
use crate::sensors::round_to;
use crate::types::{HistoryEntry, InsightSummary, MachineId, Reading, RiskTier};

pub const NO_RISK_LINE: &str = "No immediate critical risks detected.";
pub const INSPECTION_RECOMMENDATION: &str = "Immediate inspection recommended for machines >95°C.";
pub const VIBRATION_RECOMMENDATION: &str = "High average vibration — inspect mounts/bearings.";
pub const GAS_RECOMMENDATION: &str = "Elevated gas — verify ventilation and sensors.";
pub const MONITOR_RECOMMENDATION: &str =
    "Continue monitoring; consider capturing higher-frequency telemetry during stress windows.";

/// Aggregates across machines with a current reading, rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Aggregates {
    avg_temperature: f64,
    max_temperature: f64,
    avg_vibration: f64,
    max_gas_level: f64,
}

#[derive(Debug, Clone, Default)]
pub struct InsightEngine {
    config: InsightConfig,
}

impl InsightEngine {
    pub fn new(config: InsightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InsightConfig {
        &self.config
    }

    /// Derive the summary for `machines`, visited in the given order.
    ///
    /// Machines without a current reading are skipped entirely, including
    /// for spike detection.
    pub fn derive(
        &self,
        machines: &[MachineId],
        latest: &HashMap<MachineId, Reading>,
        history: &HistoryStore,
    ) -> InsightSummary {
        let mut temps = Vec::new();
        let mut vibs = Vec::new();
        let mut gases = Vec::new();
        let mut critical: Vec<&str> = Vec::new();
        let mut warning: Vec<&str> = Vec::new();
        let mut spikes = Vec::new();

        for machine in machines {
            let Some(reading) = latest.get(machine) else {
                continue;
            };
            temps.push(reading.temperature());
            vibs.push(reading.vibration());
            gases.push(reading.gas_level());

            match reading.risk_level() {
                RiskTier::Critical => critical.push(machine.as_str()),
                RiskTier::Warning => warning.push(machine.as_str()),
                RiskTier::Normal => {}
            }

            if let Some((prev, last)) = history.last_two_temperatures(machine) {
                if last - prev > self.config.spike_delta {
                    spikes.push(format!(
                        "{}: {}→{}°C",
                        machine,
                        format_value(prev),
                        format_value(last)
                    ));
                }
            }
        }

        let aggregates = aggregate(&temps, &vibs, &gases);
        let mut summary = Vec::new();

        if let Some(a) = aggregates {
            summary.push(format!("Average temperature: {} °C", format_value(a.avg_temperature)));
            summary.push(format!("Max temperature: {} °C", format_value(a.max_temperature)));
            summary.push(format!("Average vibration: {} mm/s", format_value(a.avg_vibration)));
        }

        if !critical.is_empty() {
            summary.push(format!("CRITICAL machines: {}", critical.join(", ")));
        } else if !warning.is_empty() {
            summary.push(format!("Warning-level machines: {}", warning.join(", ")));
        } else {
            summary.push(NO_RISK_LINE.to_string());
        }

        if !spikes.is_empty() {
            summary.push(format!("Temperature spikes detected: {}", spikes.join("; ")));
        }

        InsightSummary {
            summary,
            recommendations: self.recommendations(aggregates),
        }
    }

    fn recommendations(&self, aggregates: Option<Aggregates>) -> Vec<String> {
        let mut recs = Vec::new();

        if let Some(a) = aggregates {
            if a.max_temperature > self.config.inspection_temperature {
                recs.push(INSPECTION_RECOMMENDATION.to_string());
            }
            if a.avg_vibration > self.config.vibration_average_limit {
                recs.push(VIBRATION_RECOMMENDATION.to_string());
            }
            if a.max_gas_level > self.config.gas_level_limit {
                recs.push(GAS_RECOMMENDATION.to_string());
            }
        }

        if recs.is_empty() {
            recs.push(MONITOR_RECOMMENDATION.to_string());
        }
        recs
    }
}

fn aggregate(temps: &[f64], vibs: &[f64], gases: &[f64]) -> Option<Aggregates> {
    if temps.is_empty() {
        return None;
    }
    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    let max = |xs: &[f64]| xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(Aggregates {
        avg_temperature: round_to(mean(temps), 2),
        max_temperature: round_to(max(temps), 2),
        avg_vibration: round_to(mean(vibs), 2),
        max_gas_level: round_to(max(gases), 2),
    })
}

/// Render a value the way operators read it: shortest form, but always
/// with a decimal point (`70.0`, not `70`).
pub fn format_value(value: f64) -> String {
    let s = value.to_string();
    if value.is_finite() && !s.contains('.') {
        format!("{s}.0")
    } else {
        s
    }
}

// ============================================================================
// Digest
// ============================================================================

/// Compact payload for an external language-model insight request: the
/// summary lines plus the newest few history entries per machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightDigest {
    pub summary: Vec<String>,
    pub recent_history_sample: BTreeMap<MachineId, Vec<HistoryEntry>>,
}

impl InsightDigest {
    pub fn build(
        summary: &InsightSummary,
        history: &HistoryStore,
        machines: &[MachineId],
        sample_size: usize,
    ) -> Self {
        Self {
            summary: summary.summary.clone(),
            recent_history_sample: machines
                .iter()
                .map(|m| (m.clone(), history.tail(m, sample_size)))
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
