//! Monitor Coordinator - one tick of the telemetry pipeline
//!
//! ```text
//! for each machine, in registration order:
//!     source  -> sample
//!     assessor -> risk tier            (never fails; degrades per policy)
//!     latest readings <- reading
//!     alert manager   <- reading
//!     history store   <- reading
//! then once:
//!     alarm latch     <- any critical
//!     insight engine  -> summary
//! ```
//!
//! A failure for one machine (source or classifier) never aborts the tick.

use chrono::Utc;
use tracing::{debug, info, warn};

use super::registry::{MachineRegistry, RegistryError};
use super::state::{MonitorSnapshot, MonitorState};
use crate::alerts::AlertManager;
use crate::classifier::{AssessorStats, ClassificationPath, ClassifyError, RiskAssessor};
use crate::config::MonitorConfig;
use crate::history_storage::{AppendOutcome, HistoryStore};
use crate::insights::{InsightDigest, InsightEngine};
use crate::sensors::{ReadingSource, SyntheticSource};
use crate::types::{AcknowledgmentRecord, InsightSummary, MachineId, Reading};

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("classifier setup failed: {0}")]
    Classifier(#[from] ClassifyError),
    #[error("tick {tick}: no machine produced a reading")]
    NoReadings { tick: u64 },
}

/// Per-tick counters, kept for the most recent tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub readings: usize,
    pub critical: usize,
    pub alerts_raised: usize,
    pub degraded: usize,
    pub source_failures: usize,
    pub duplicates: usize,
    pub alarm_raised: bool,
}

impl std::fmt::Display for TickReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tick {}: {} readings, {} critical, {} alerts raised, {} degraded, {} source failures",
            self.tick,
            self.readings,
            self.critical,
            self.alerts_raised,
            self.degraded,
            self.source_failures
        )
    }
}

/// Owns the monitor state and drives ticks over it.
pub struct Monitor {
    registry: MachineRegistry,
    source: Box<dyn ReadingSource>,
    assessor: RiskAssessor,
    insights: InsightEngine,
    state: MonitorState,
    digest_sample_size: usize,
    last_report: TickReport,
}

impl Monitor {
    pub fn new(
        config: &MonitorConfig,
        source: Box<dyn ReadingSource>,
        assessor: RiskAssessor,
    ) -> Result<Self, MonitorError> {
        let registry = MachineRegistry::new(&config.machines.ids)?;

        info!(
            machines = registry.len(),
            source = source.source_name(),
            remote_classifier = assessor.uses_remote(),
            history_capacity = config.history.capacity,
            "Monitor initialized"
        );

        Ok(Self {
            registry,
            source,
            assessor,
            insights: InsightEngine::new(config.insights.clone()),
            state: MonitorState::new(HistoryStore::new(&config.history), AlertManager::new()),
            digest_sample_size: config.insights.digest_sample_size,
            last_report: TickReport::default(),
        })
    }

    /// Synthetic source plus the classifier chosen by the credential environment.
    pub fn from_config(config: &MonitorConfig, seed: Option<u64>) -> Result<Self, MonitorError> {
        let source = match seed {
            Some(seed) => SyntheticSource::with_seed(config.generator.clone(), seed),
            None => SyntheticSource::new(config.generator.clone()),
        };
        let assessor = RiskAssessor::from_config(config)?;
        Self::new(config, Box::new(source), assessor)
    }

    /// Run one full tick.
    ///
    /// Errors only when not a single machine produced a reading; state for
    /// the tick (alarm latch, insights) is still updated in that case.
    pub async fn tick(&mut self) -> Result<(), MonitorError> {
        self.state.tick += 1;
        let tick = self.state.tick;
        let now = Utc::now();
        self.state.last_tick_at = Some(now);

        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };

        for machine in self.registry.machines() {
            let sample = match self.source.next_reading(machine, tick, now).await {
                Ok(sample) => sample,
                Err(e) => {
                    warn!(machine = %machine, tick, error = %e, "Reading source failed, skipping machine");
                    report.source_failures += 1;
                    continue;
                }
            };

            let assessment = self.assessor.assess(&sample).await;
            if assessment.path == ClassificationPath::Degraded {
                report.degraded += 1;
            }

            let reading = sample.classify_as(assessment.tier);
            debug!(
                machine = %machine,
                tick,
                temperature = reading.temperature(),
                vibration = reading.vibration(),
                gas_level = reading.gas_level(),
                tier = %reading.risk_level(),
                "Reading classified"
            );

            if self.state.alerts.on_classified(&reading, Utc::now()).is_some() {
                report.alerts_raised += 1;
            }
            if self.state.history.record(&reading) == AppendOutcome::Duplicate {
                report.duplicates += 1;
            }
            self.state.latest.insert(machine.clone(), reading);
            report.readings += 1;
        }

        report.critical = self
            .registry
            .machines()
            .iter()
            .filter_map(|m| self.state.latest.get(m))
            .filter(|r| r.is_critical())
            .count();
        report.alarm_raised = self.state.alerts.observe_tick(report.critical > 0);

        self.state.insights =
            self.insights
                .derive(self.registry.machines(), &self.state.latest, &self.state.history);

        info!(active_alerts = self.state.alerts.active_count(), "{}", report);
        let produced = report.readings;
        self.last_report = report;

        if produced == 0 {
            return Err(MonitorError::NoReadings { tick });
        }
        Ok(())
    }

    pub fn machines(&self) -> &[MachineId] {
        self.registry.machines()
    }

    pub fn tick_count(&self) -> u64 {
        self.state.tick
    }

    pub fn last_report(&self) -> &TickReport {
        &self.last_report
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn latest(&self, machine: &str) -> Option<&Reading> {
        let id = self.registry.resolve(machine).ok()?;
        self.state.latest.get(id)
    }

    pub fn insights(&self) -> &InsightSummary {
        &self.state.insights
    }

    pub fn assessor_stats(&self) -> &AssessorStats {
        self.assessor.stats()
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.state.snapshot(self.registry.machines())
    }

    /// Summary plus recent history, ready to hand to a language model.
    pub fn digest(&self) -> InsightDigest {
        InsightDigest::build(
            &self.state.insights,
            &self.state.history,
            self.registry.machines(),
            self.digest_sample_size,
        )
    }

    /// Remove the active alert for `machine`.
    ///
    /// `Ok(None)` when the machine is registered but has no active alert.
    pub fn acknowledge(
        &mut self,
        machine: &str,
        acknowledged_by: &str,
        notes: &str,
    ) -> Result<Option<AcknowledgmentRecord>, MonitorError> {
        let id = self.registry.resolve(machine)?.clone();
        Ok(self
            .state
            .alerts
            .acknowledge(&id, acknowledged_by, notes, Utc::now()))
    }

    /// Returns whether the alarm was active.
    pub fn silence_alarm(&mut self) -> bool {
        self.state.alerts.silence_alarm()
    }
}
