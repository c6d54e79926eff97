//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery. Every `MonitorConfig` default
//! comes from here.

// ============================================================================
// Machines
// ============================================================================

/// Machines registered when no config file names any.
pub const DEFAULT_MACHINES: [&str; 4] = ["M1", "M2", "M3", "M4"];

// ============================================================================
// Synthetic Generator
// ============================================================================

pub const TEMPERATURE_RANGE_C: (f64, f64) = (20.0, 110.0);
pub const VIBRATION_RANGE_MM_S: (f64, f64) = (0.0, 4.5);
pub const GAS_LEVEL_RANGE: (f64, f64) = (0.0, 20.0);

/// Decimal places kept on generated values.
pub const GENERATOR_DECIMALS: u32 = 2;

// ============================================================================
// Threshold Fallback Classifier
// ============================================================================

/// Temperature above this is Critical (exclusive, °C).
pub const TEMPERATURE_CRITICAL_C: f64 = 90.0;

/// Vibration above this is Critical (exclusive, mm/s).
pub const VIBRATION_CRITICAL_MM_S: f64 = 4.0;

/// Gas level above this is Critical (exclusive).
pub const GAS_LEVEL_CRITICAL: f64 = 15.0;

// ============================================================================
// Remote Classifier
// ============================================================================

pub const CLASSIFIER_ENDPOINT: &str = "https://api.mistral.ai/v1/chat/completions";

pub const CLASSIFIER_MODEL: &str = "mistral-small";

/// Environment variable holding the bearer credential.
pub const CLASSIFIER_API_KEY_ENV: &str = "MISTRAL_API_KEY";

/// Upper bound on one remote classification call (seconds).
pub const CLASSIFIER_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// History
// ============================================================================

/// Entries kept per machine.
pub const HISTORY_CAPACITY: usize = 20;

// ============================================================================
// Insights
// ============================================================================

/// Tick-over-tick temperature rise that counts as a spike (°C, exclusive).
pub const SPIKE_DELTA_C: f64 = 8.0;

/// Max temperature above which an inspection is recommended (°C).
pub const INSPECTION_TEMPERATURE_C: f64 = 95.0;

/// Average vibration above which mounts/bearings should be inspected (mm/s).
pub const VIBRATION_AVERAGE_LIMIT_MM_S: f64 = 3.0;

/// Max gas level above which ventilation should be verified.
pub const GAS_LEVEL_LIMIT: f64 = 15.0;

/// History entries per machine included in an insight digest.
pub const DIGEST_SAMPLE_SIZE: usize = 5;

// ============================================================================
// Scheduler / Alerts
// ============================================================================

/// Interval between ticks (ms).
pub const TICK_INTERVAL_MS: u64 = 3_000;

/// Acknowledgment records kept in memory.
pub const MAX_ACKNOWLEDGMENTS: usize = 1_000;

/// Operator command channel buffer.
pub const COMMAND_CHANNEL_SIZE: usize = 32;
