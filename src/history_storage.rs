//! History Storage Module
//!
//! Bounded in-memory window of recent classified readings per machine.
//! Entries are kept oldest-first; appending past capacity evicts from the
//! front. A second append for the same tick is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use tracing::debug;

use crate::config::{DedupPolicy, HistoryConfig};
use crate::types::{HistoryEntry, MachineId, Reading};

/// Result of one append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Appended and the oldest entry was dropped
    AppendedWithEviction,
    /// Same tick as the newest stored entry; nothing changed
    Duplicate,
}

/// Per-machine temperature histories aligned on a shared time axis.
///
/// `timestamps` is the sorted union of every machine's entry timestamps.
/// `series[i].1[j]` is that machine's temperature at `timestamps[j]`, or
/// `None` when it has no entry at that instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSeries {
    pub timestamps: Vec<DateTime<Utc>>,
    pub series: Vec<(MachineId, Vec<Option<f64>>)>,
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    entries: HashMap<MachineId, VecDeque<HistoryEntry>>,
    capacity: usize,
    dedup: DedupPolicy,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(&HistoryConfig::default())
    }
}

impl HistoryStore {
    pub fn new(config: &HistoryConfig) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: config.capacity.max(1),
            dedup: config.dedup,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dedup_policy(&self) -> DedupPolicy {
        self.dedup
    }

    /// Append the projection of a classified reading.
    pub fn record(&mut self, reading: &Reading) -> AppendOutcome {
        self.append(reading.machine_id(), HistoryEntry::from(reading))
    }

    /// Append one entry for `machine`.
    pub fn append(&mut self, machine: &MachineId, entry: HistoryEntry) -> AppendOutcome {
        let window = self.entries.entry(machine.clone()).or_default();

        if let Some(last) = window.back() {
            let same = match self.dedup {
                DedupPolicy::TickSequence => last.tick == entry.tick,
                DedupPolicy::Timestamp => last.timestamp == entry.timestamp,
            };
            if same {
                debug!(machine = %machine, tick = entry.tick, "Duplicate history entry ignored");
                return AppendOutcome::Duplicate;
            }
        }

        window.push_back(entry);
        if window.len() > self.capacity {
            window.pop_front();
            AppendOutcome::AppendedWithEviction
        } else {
            AppendOutcome::Appended
        }
    }

    /// Entries for `machine`, oldest first. Empty for unknown machines.
    pub fn history(&self, machine: &MachineId) -> impl Iterator<Item = &HistoryEntry> + '_ {
        self.entries.get(machine).into_iter().flatten()
    }

    pub fn len(&self, machine: &MachineId) -> usize {
        self.entries.get(machine).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(VecDeque::is_empty)
    }

    /// Newest entry for `machine`.
    pub fn latest(&self, machine: &MachineId) -> Option<&HistoryEntry> {
        self.entries.get(machine).and_then(VecDeque::back)
    }

    /// The two newest temperatures as `(previous, last)`.
    pub fn last_two_temperatures(&self, machine: &MachineId) -> Option<(f64, f64)> {
        let window = self.entries.get(machine)?;
        let n = window.len();
        if n < 2 {
            return None;
        }
        Some((window[n - 2].temperature, window[n - 1].temperature))
    }

    /// The newest `n` entries for `machine`, oldest first.
    pub fn tail(&self, machine: &MachineId, n: usize) -> Vec<HistoryEntry> {
        self.entries
            .get(machine)
            .map(|w| w.iter().skip(w.len().saturating_sub(n)).cloned().collect())
            .unwrap_or_default()
    }

    /// Align temperature histories of `machines` on one time axis.
    pub fn temperature_series(&self, machines: &[MachineId]) -> TemperatureSeries {
        let timestamps: Vec<DateTime<Utc>> = machines
            .iter()
            .filter_map(|m| self.entries.get(m))
            .flatten()
            .map(|e| e.timestamp)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let series = machines
            .iter()
            .map(|m| {
                let by_time: HashMap<DateTime<Utc>, f64> = self
                    .entries
                    .get(m)
                    .into_iter()
                    .flatten()
                    .map(|e| (e.timestamp, e.temperature))
                    .collect();
                let column = timestamps.iter().map(|ts| by_time.get(ts).copied()).collect();
                (m.clone(), column)
            })
            .collect();

        TemperatureSeries { timestamps, series }
    }
}
