//! Alert management
//!
//! Keeps at most one active alert per machine. A critical reading creates or
//! replaces the machine's alert; a non-critical reading leaves it alone.
//! Alerts are only removed by an operator acknowledgment.
//!
//! The alarm latch is separate: it goes active on the first tick with any
//! critical reading and stays active until silenced.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use tracing::{info, warn};

use crate::config::defaults::MAX_ACKNOWLEDGMENTS;
use crate::types::{AcknowledgmentRecord, Alert, MachineId, Reading};

// ============================================================================
// Alarm Latch
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmLatch {
    active: bool,
}

impl AlarmLatch {
    /// Feed one tick's outcome. Returns true on the rising edge only.
    pub fn observe(&mut self, any_critical: bool) -> bool {
        if any_critical && !self.active {
            self.active = true;
            return true;
        }
        false
    }

    /// Returns whether the alarm was active.
    pub fn silence(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

// ============================================================================
// Alert Manager
// ============================================================================

#[derive(Debug, Clone)]
pub struct AlertManager {
    active: HashMap<MachineId, Alert>,
    acknowledgments: VecDeque<AcknowledgmentRecord>,
    max_acknowledgments: usize,
    alarm: AlarmLatch,
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertManager {
    pub fn new() -> Self {
        Self::with_ack_capacity(MAX_ACKNOWLEDGMENTS)
    }

    pub fn with_ack_capacity(max_acknowledgments: usize) -> Self {
        Self {
            active: HashMap::new(),
            acknowledgments: VecDeque::new(),
            max_acknowledgments: max_acknowledgments.max(1),
            alarm: AlarmLatch::default(),
        }
    }

    /// Apply one classified reading. Returns the new alert when one was raised.
    pub fn on_classified(&mut self, reading: &Reading, now: DateTime<Utc>) -> Option<Alert> {
        if !reading.is_critical() {
            return None;
        }

        let alert = Alert::critical(reading, now);
        let replaced = self
            .active
            .insert(reading.machine_id().clone(), alert.clone())
            .is_some();

        warn!(
            machine = %reading.machine_id(),
            temperature = reading.temperature(),
            vibration = reading.vibration(),
            gas_level = reading.gas_level(),
            replaced,
            "{}",
            alert.message
        );
        Some(alert)
    }

    /// Remove the active alert for `machine` and record who acknowledged it.
    ///
    /// Returns `None` (and records nothing) when there is no active alert.
    pub fn acknowledge(
        &mut self,
        machine: &MachineId,
        acknowledged_by: impl Into<String>,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Option<AcknowledgmentRecord> {
        let alert = self.active.remove(machine)?;
        let record = AcknowledgmentRecord {
            machine_id: machine.clone(),
            acknowledged_by: acknowledged_by.into(),
            acknowledged_at: now,
            notes: notes.into(),
            alert,
        };

        self.acknowledgments.push_back(record.clone());
        while self.acknowledgments.len() > self.max_acknowledgments {
            self.acknowledgments.pop_front();
        }

        info!(machine = %machine, by = %record.acknowledged_by, "Alert acknowledged");
        Some(record)
    }

    pub fn get(&self, machine: &MachineId) -> Option<&Alert> {
        self.active.get(machine)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active alerts in the given machine order; machines without one are skipped.
    pub fn active_in_order<'a>(&'a self, order: &'a [MachineId]) -> impl Iterator<Item = &'a Alert> + 'a {
        order.iter().filter_map(|m| self.active.get(m))
    }

    /// Acknowledgment audit trail, oldest first.
    pub fn acknowledgments(&self) -> &VecDeque<AcknowledgmentRecord> {
        &self.acknowledgments
    }

    /// Update the alarm latch from one tick. Returns true if it just went active.
    pub fn observe_tick(&mut self, any_critical: bool) -> bool {
        let raised = self.alarm.observe(any_critical);
        if raised {
            warn!("Alarm raised: critical readings present");
        }
        raised
    }

    /// Silence the alarm. Active alerts are kept.
    pub fn silence_alarm(&mut self) -> bool {
        let was_active = self.alarm.silence();
        if was_active {
            info!("Alarm silenced by operator");
        }
        was_active
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RiskTier, SensorReading};
    use chrono::Duration;

    fn reading(machine: &str, tick: u64, tier: RiskTier) -> Reading {
        SensorReading {
            machine_id: MachineId::new(machine),
            temperature: 95.0,
            vibration: 1.0,
            gas_level: 2.0,
            timestamp: Utc::now(),
            tick,
        }
        .classify_as(tier)
    }

    #[test]
    fn test_critical_creates_alert() {
        let mut mgr = AlertManager::new();
        let now = Utc::now();
        let alert = mgr.on_classified(&reading("M1", 1, RiskTier::Critical), now).unwrap();

        assert_eq!(alert.machine_id.as_str(), "M1");
        assert_eq!(alert.message, "CRITICAL ALERT: M1 exceeded thresholds!");
        assert_eq!(alert.timestamp, now);
        assert_eq!(alert.details.tick(), 1);
        assert_eq!(mgr.active_count(), 1);
    }

    #[test]
    fn test_non_critical_raises_nothing() {
        let mut mgr = AlertManager::new();
        assert!(mgr.on_classified(&reading("M1", 1, RiskTier::Warning), Utc::now()).is_none());
        assert!(mgr.on_classified(&reading("M1", 2, RiskTier::Normal), Utc::now()).is_none());
        assert_eq!(mgr.active_count(), 0);
    }

    #[test]
    fn test_repeated_critical_replaces() {
        let mut mgr = AlertManager::new();
        let t0 = Utc::now();
        mgr.on_classified(&reading("M1", 1, RiskTier::Critical), t0);
        mgr.on_classified(&reading("M1", 2, RiskTier::Critical), t0 + Duration::seconds(3));

        assert_eq!(mgr.active_count(), 1);
        let alert = mgr.get(&MachineId::new("M1")).unwrap();
        assert_eq!(alert.details.tick(), 2);
        assert_eq!(alert.timestamp, t0 + Duration::seconds(3));
    }

    #[test]
    fn test_alert_survives_recovery() {
        let mut mgr = AlertManager::new();
        mgr.on_classified(&reading("M1", 1, RiskTier::Critical), Utc::now());
        mgr.on_classified(&reading("M1", 2, RiskTier::Normal), Utc::now());

        let alert = mgr.get(&MachineId::new("M1")).unwrap();
        assert_eq!(alert.details.tick(), 1);
    }

    #[test]
    fn test_acknowledge_removes_and_records() {
        let mut mgr = AlertManager::new();
        let m1 = MachineId::new("M1");
        mgr.on_classified(&reading("M1", 1, RiskTier::Critical), Utc::now());

        let record = mgr.acknowledge(&m1, "operator", "checked coolant", Utc::now()).unwrap();
        assert_eq!(record.acknowledged_by, "operator");
        assert_eq!(record.alert.details.tick(), 1);
        assert!(mgr.get(&m1).is_none());
        assert_eq!(mgr.acknowledgments().len(), 1);

        // Nothing left to acknowledge
        assert!(mgr.acknowledge(&m1, "operator", "", Utc::now()).is_none());
        assert_eq!(mgr.acknowledgments().len(), 1);
    }

    #[test]
    fn test_acknowledgment_log_is_bounded() {
        let mut mgr = AlertManager::with_ack_capacity(3);
        let m1 = MachineId::new("M1");
        for tick in 0..5 {
            mgr.on_classified(&reading("M1", tick, RiskTier::Critical), Utc::now());
            mgr.acknowledge(&m1, format!("op{tick}"), "", Utc::now());
        }
        let by: Vec<_> = mgr.acknowledgments().iter().map(|r| r.acknowledged_by.as_str()).collect();
        assert_eq!(by, vec!["op2", "op3", "op4"]);
    }

    #[test]
    fn test_active_in_order_follows_registration() {
        let mut mgr = AlertManager::new();
        mgr.on_classified(&reading("M3", 1, RiskTier::Critical), Utc::now());
        mgr.on_classified(&reading("M1", 1, RiskTier::Critical), Utc::now());
        let order = vec![MachineId::new("M1"), MachineId::new("M2"), MachineId::new("M3")];
        let ids: Vec<_> = mgr.active_in_order(&order).map(|a| a.machine_id.as_str()).collect();
        assert_eq!(ids, vec!["M1", "M3"]);
    }

    #[test]
    fn test_alarm_latch_edges() {
        let mut mgr = AlertManager::new();
        assert!(!mgr.observe_tick(false));
        assert!(mgr.observe_tick(true));
        // Already active: no second rising edge
        assert!(!mgr.observe_tick(true));
        // Recovery does not clear the latch
        assert!(!mgr.observe_tick(false));
        assert!(mgr.alarm_active());

        assert!(mgr.silence_alarm());
        assert!(!mgr.alarm_active());
        assert!(!mgr.silence_alarm());
        assert!(mgr.observe_tick(true));
    }

    #[test]
    fn test_silence_keeps_alerts() {
        let mut mgr = AlertManager::new();
        mgr.on_classified(&reading("M2", 1, RiskTier::Critical), Utc::now());
        mgr.observe_tick(true);
        mgr.silence_alarm();
        assert_eq!(mgr.active_count(), 1);
    }
}
