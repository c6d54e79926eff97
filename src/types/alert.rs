//! Alert types: Alert, AcknowledgmentRecord

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MachineId, Reading};

/// Active critical alert for one machine.
///
/// At most one exists per machine; a newer critical reading replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub machine_id: MachineId,
    pub message: String,
    /// When the alert was raised (not the reading timestamp)
    pub timestamp: DateTime<Utc>,
    /// Snapshot of the reading that triggered the alert
    pub details: Reading,
}

impl Alert {
    pub fn critical(reading: &Reading, raised_at: DateTime<Utc>) -> Self {
        Self {
            machine_id: reading.machine_id().clone(),
            message: format!("CRITICAL ALERT: {} exceeded thresholds!", reading.machine_id()),
            timestamp: raised_at,
            details: reading.clone(),
        }
    }
}

/// Audit record written when an operator acknowledges an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcknowledgmentRecord {
    pub machine_id: MachineId,
    pub acknowledged_by: String,
    pub acknowledged_at: DateTime<Utc>,
    pub notes: String,
    /// The alert that was removed
    pub alert: Alert,
}
