//! Machine Guard: Real-time Equipment Telemetry Monitor
//!
//! Samples temperature, vibration and gas level from a set of machines on a
//! fixed tick, classifies each sample into a risk tier, raises alerts for
//! critical machines, keeps a bounded per-machine history and derives a
//! short diagnostic summary.
//!
//! ## Architecture
//!
//! - **Sensors**: where samples come from (synthetic by default)
//! - **Classifier**: remote inference service with a threshold fallback
//! - **Alerts**: one active alert per machine, cleared by acknowledgment
//! - **History Storage**: bounded window per machine
//! - **Insights**: aggregate statistics, spike detection, recommendations
//! - **Pipeline**: tick coordinator and interval scheduler

pub mod config;
pub mod types;
pub mod sensors;
pub mod classifier;
pub mod alerts;
pub mod history_storage;
pub mod insights;
pub mod pipeline;

// Re-export configuration
pub use config::MonitorConfig;

// Re-export commonly used types
pub use types::{
    AcknowledgmentRecord, Alert, HistoryEntry, InsightSummary, MachineId, Reading, RiskTier,
    SensorReading,
};

pub use alerts::AlertManager;
pub use classifier::{ClassifyError, RiskAssessor, RiskClassifier};
pub use history_storage::{HistoryStore, TemperatureSeries};
pub use insights::{InsightDigest, InsightEngine};
pub use pipeline::{Monitor, MonitorError, MonitorSnapshot, Scheduler, SchedulerHandle};
pub use sensors::{ReadingSource, SyntheticSource};
