//! Shared data structures for the telemetry pipeline
//!
//! - Ingestion: SensorReading (unclassified sample)
//! - Classification: RiskTier, Reading
//! - Alerting: Alert, AcknowledgmentRecord
//! - History: HistoryEntry
//! - Insights: InsightSummary

mod reading;
mod alert;
mod history;
mod insight;

pub use reading::*;
pub use alert::*;
pub use history::*;
pub use insight::*;
