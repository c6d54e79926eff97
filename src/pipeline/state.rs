//! Monitor state and the read-only snapshot handed to consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::alerts::AlertManager;
use crate::history_storage::HistoryStore;
use crate::types::{Alert, HistoryEntry, InsightSummary, MachineId, Reading};

// ============================================================================
// Monitor State
// ============================================================================

/// Everything one monitor mutates across ticks. Owned by the coordinator.
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    /// Latest classified reading per machine
    pub latest: HashMap<MachineId, Reading>,
    pub alerts: AlertManager,
    pub history: HistoryStore,
    /// Summary derived at the end of the last tick
    pub insights: InsightSummary,
    /// Number of ticks started
    pub tick: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
}

impl MonitorState {
    pub fn new(history: HistoryStore, alerts: AlertManager) -> Self {
        Self {
            history,
            alerts,
            ..Self::default()
        }
    }

    /// Immutable copy of the state in `machines` order.
    pub fn snapshot(&self, machines: &[MachineId]) -> MonitorSnapshot {
        MonitorSnapshot {
            tick: self.tick,
            taken_at: self.last_tick_at,
            latest: machines
                .iter()
                .filter_map(|m| self.latest.get(m))
                .cloned()
                .collect(),
            alerts: self.alerts.active_in_order(machines).cloned().collect(),
            history: machines
                .iter()
                .map(|m| MachineHistory {
                    machine_id: m.clone(),
                    entries: self.history.history(m).cloned().collect(),
                })
                .collect(),
            insights: self.insights.clone(),
            alarm_active: self.alerts.alarm_active(),
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineHistory {
    pub machine_id: MachineId,
    pub entries: Vec<HistoryEntry>,
}

/// Point-in-time view published after every tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub tick: u64,
    pub taken_at: Option<DateTime<Utc>>,
    /// Registration order; machines without a reading yet are absent
    pub latest: Vec<Reading>,
    pub alerts: Vec<Alert>,
    pub history: Vec<MachineHistory>,
    pub insights: InsightSummary,
    pub alarm_active: bool,
}

impl MonitorSnapshot {
    pub fn reading(&self, machine: &str) -> Option<&Reading> {
        self.latest.iter().find(|r| r.machine_id().as_str() == machine)
    }

    pub fn alert(&self, machine: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.machine_id.as_str() == machine)
    }

    pub fn history_of(&self, machine: &str) -> &[HistoryEntry] {
        self.history
            .iter()
            .find(|h| h.machine_id.as_str() == machine)
            .map_or(&[], |h| h.entries.as_slice())
    }
}
