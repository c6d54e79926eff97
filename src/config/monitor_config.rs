//! Monitor Configuration - operator-tunable TOML values
//!
//! Each struct implements `Default` with values from [`super::defaults`],
//! so a missing file or section behaves exactly like the built-in monitor.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "MACHINE_GUARD_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "machine_guard.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one monitor deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Registered machines, in tick order
    #[serde(default)]
    pub machines: MachinesConfig,

    /// Synthetic reading ranges
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Threshold fallback classifier
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Remote classification service
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// History window
    #[serde(default)]
    pub history: HistoryConfig,

    /// Insight rules
    #[serde(default)]
    pub insights: InsightConfig,

    /// Tick scheduling
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl MonitorConfig {
    /// Load configuration using the standard search order:
    /// 1. `$MACHINE_GUARD_CONFIG`
    /// 2. `./machine_guard.toml`
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), machines = config.machines.ids.len(), "Loaded monitor config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(machines = config.machines.ids.len(), "Loaded monitor config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        // Unknown keys are warnings only
        for w in super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every section for impossible values.
    ///
    /// All problems are collected and reported together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.machines.ids.is_empty() {
            errors.push("machines.ids: at least one machine must be registered".to_string());
        }

        let g = &self.generator;
        Self::check_range(g.temperature, "generator.temperature", &mut errors);
        Self::check_range(g.vibration, "generator.vibration", &mut errors);
        Self::check_range(g.gas_level, "generator.gas_level", &mut errors);

        let t = &self.thresholds;
        Self::check_limit(t.temperature_critical, "thresholds.temperature_critical", &mut errors);
        Self::check_limit(t.vibration_critical, "thresholds.vibration_critical", &mut errors);
        Self::check_limit(t.gas_level_critical, "thresholds.gas_level_critical", &mut errors);

        if self.classifier.timeout_secs == 0 {
            errors.push("classifier.timeout_secs: must be > 0".to_string());
        }
        if self.classifier.endpoint.trim().is_empty() {
            errors.push("classifier.endpoint: must not be empty".to_string());
        }

        if self.history.capacity == 0 {
            errors.push("history.capacity: must be > 0".to_string());
        }

        let i = &self.insights;
        Self::check_limit(i.spike_delta, "insights.spike_delta", &mut errors);
        Self::check_limit(i.inspection_temperature, "insights.inspection_temperature", &mut errors);
        Self::check_limit(i.vibration_average_limit, "insights.vibration_average_limit", &mut errors);
        Self::check_limit(i.gas_level_limit, "insights.gas_level_limit", &mut errors);

        if self.scheduler.tick_interval_ms == 0 {
            errors.push("scheduler.tick_interval_ms: must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_range((low, high): (f64, f64), name: &str, errors: &mut Vec<String>) {
        if !low.is_finite() || !high.is_finite() {
            errors.push(format!("{name}: bounds must be finite (got {low}..{high})"));
            return;
        }
        if high < low {
            errors.push(format!("{name}: upper bound ({high:.3}) must be >= lower ({low:.3})"));
        }
    }

    fn check_limit(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value < 0.0 {
            errors.push(format!("{name}: must be a finite non-negative value (got {value})"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachinesConfig {
    pub ids: Vec<String>,
}

impl Default for MachinesConfig {
    fn default() -> Self {
        Self {
            ids: defaults::DEFAULT_MACHINES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Uniform sampling ranges `(low, high)` for the synthetic generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub temperature: (f64, f64),
    pub vibration: (f64, f64),
    pub gas_level: (f64, f64),
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            temperature: defaults::TEMPERATURE_RANGE_C,
            vibration: defaults::VIBRATION_RANGE_MM_S,
            gas_level: defaults::GAS_LEVEL_RANGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub temperature_critical: f64,
    pub vibration_critical: f64,
    pub gas_level_critical: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temperature_critical: defaults::TEMPERATURE_CRITICAL_C,
            vibration_critical: defaults::VIBRATION_CRITICAL_MM_S,
            gas_level_critical: defaults::GAS_LEVEL_CRITICAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the env var holding the credential (not the credential itself)
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl ClassifierConfig {
    /// Credential from the environment; `None` when unset or blank.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::CLASSIFIER_ENDPOINT.to_string(),
            model: defaults::CLASSIFIER_MODEL.to_string(),
            api_key_env: defaults::CLASSIFIER_API_KEY_ENV.to_string(),
            timeout_secs: defaults::CLASSIFIER_TIMEOUT_SECS,
        }
    }
}

/// What makes two consecutive history entries "the same tick".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Same tick sequence number
    #[default]
    TickSequence,
    /// Same wall-clock timestamp
    Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub dedup: DedupPolicy,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::HISTORY_CAPACITY,
            dedup: DedupPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    pub spike_delta: f64,
    pub inspection_temperature: f64,
    pub vibration_average_limit: f64,
    pub gas_level_limit: f64,
    pub digest_sample_size: usize,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            spike_delta: defaults::SPIKE_DELTA_C,
            inspection_temperature: defaults::INSPECTION_TEMPERATURE_C,
            vibration_average_limit: defaults::VIBRATION_AVERAGE_LIMIT_MM_S,
            gas_level_limit: defaults::GAS_LEVEL_LIMIT,
            digest_sample_size: defaults::DIGEST_SAMPLE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub tick_interval_ms: u64,
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: defaults::TICK_INTERVAL_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.machines.ids, vec!["M1", "M2", "M3", "M4"]);
        assert_eq!(config.history.capacity, 20);
        assert_eq!(config.history.dedup, DedupPolicy::TickSequence);
        assert_eq!(config.classifier.timeout(), Duration::from_secs(10));
        assert_eq!(config.scheduler.tick_interval(), Duration::from_millis(3000));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: MonitorConfig = toml::from_str(
            r#"
[machines]
ids = ["press-1", "lathe-2"]

[history]
capacity = 5
dedup = "timestamp"
"#,
        )
        .unwrap();

        assert_eq!(config.machines.ids, vec!["press-1", "lathe-2"]);
        assert_eq!(config.history.capacity, 5);
        assert_eq!(config.history.dedup, DedupPolicy::Timestamp);
        assert_eq!(config.thresholds, ThresholdConfig::default());
        assert_eq!(config.insights.spike_delta, 8.0);
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = MonitorConfig::default();
        config.machines.ids.clear();
        config.history.capacity = 0;
        config.generator.vibration = (4.5, 0.0);
        config.thresholds.gas_level_critical = f64::NAN;

        match config.validate() {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 4, "{errors:?}");
                assert!(errors.iter().any(|e| e.starts_with("machines.ids")));
                assert!(errors.iter().any(|e| e.starts_with("history.capacity")));
                assert!(errors.iter().any(|e| e.starts_with("generator.vibration")));
                assert!(errors.iter().any(|e| e.starts_with("thresholds.gas_level_critical")));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_toml_roundtrip_is_stable() {
        let config = MonitorConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: MonitorConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
