//! Tick Scheduler - periodic driver for [`Monitor::tick`]
//!
//! Single task, strictly serialized:
//! - ticks fire on a `tokio::time::interval`; a slow tick delays the next
//!   one instead of overlapping it
//! - operator commands arrive on an mpsc channel and are applied between
//!   ticks, each answered over a oneshot
//! - a snapshot is published on a watch channel after every tick and command
//!
//! Stops on cancellation or after an optional tick limit.

use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::coordinator::{Monitor, MonitorError};
use super::state::MonitorSnapshot;
use crate::config::defaults::COMMAND_CHANNEL_SIZE;
use crate::types::AcknowledgmentRecord;

// ============================================================================
// Commands
// ============================================================================

/// Operator command applied between ticks.
#[derive(Debug)]
pub enum OperatorCommand {
    Acknowledge {
        machine: String,
        acknowledged_by: String,
        notes: String,
        reply: oneshot::Sender<Result<Option<AcknowledgmentRecord>, MonitorError>>,
    },
    SilenceAlarm {
        reply: oneshot::Sender<bool>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("scheduler is not running")]
    Closed,
    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

/// Cloneable handle for sending commands and watching snapshots.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    commands: mpsc::Sender<OperatorCommand>,
    snapshots: watch::Receiver<MonitorSnapshot>,
}

impl SchedulerHandle {
    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.snapshots.clone()
    }

    /// Most recently published snapshot.
    pub fn current(&self) -> MonitorSnapshot {
        self.snapshots.borrow().clone()
    }

    pub async fn acknowledge(
        &self,
        machine: &str,
        acknowledged_by: &str,
        notes: &str,
    ) -> Result<Option<AcknowledgmentRecord>, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(OperatorCommand::Acknowledge {
                machine: machine.to_string(),
                acknowledged_by: acknowledged_by.to_string(),
                notes: notes.to_string(),
                reply,
            })
            .await
            .map_err(|_| CommandError::Closed)?;
        Ok(rx.await.map_err(|_| CommandError::Closed)??)
    }

    /// Returns whether the alarm was active.
    pub async fn silence_alarm(&self) -> Result<bool, CommandError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(OperatorCommand::SilenceAlarm { reply })
            .await
            .map_err(|_| CommandError::Closed)?;
        rx.await.map_err(|_| CommandError::Closed)
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Counters returned when the scheduler stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    pub ticks: u64,
    pub failed_ticks: u64,
    pub commands: u64,
}

impl std::fmt::Display for SchedulerSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Scheduler: {} ticks ({} failed), {} operator commands",
            self.ticks, self.failed_ticks, self.commands
        )
    }
}

pub struct Scheduler {
    monitor: Monitor,
    interval: Duration,
    max_ticks: Option<u64>,
    cancel_token: CancellationToken,
    commands: mpsc::Receiver<OperatorCommand>,
    snapshots: watch::Sender<MonitorSnapshot>,
}

impl Scheduler {
    pub fn new(
        monitor: Monitor,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> (Self, SchedulerHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (snap_tx, snap_rx) = watch::channel(monitor.snapshot());

        let scheduler = Self {
            monitor,
            interval,
            max_ticks: None,
            cancel_token,
            commands: cmd_rx,
            snapshots: snap_tx,
        };
        let handle = SchedulerHandle {
            commands: cmd_tx,
            snapshots: snap_rx,
        };
        (scheduler, handle)
    }

    /// Stop after `limit` ticks.
    pub fn with_tick_limit(mut self, limit: Option<u64>) -> Self {
        self.max_ticks = limit;
        self
    }

    /// Run until cancelled or the tick limit is reached. Returns the monitor
    /// so callers can inspect final state.
    pub async fn run(mut self) -> (Monitor, SchedulerSummary) {
        let mut summary = SchedulerSummary::default();
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = self.interval.as_millis() as u64,
            max_ticks = ?self.max_ticks,
            machines = self.monitor.machines().len(),
            "⏱️  Tick scheduler started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.cancel_token.cancelled() => {
                    info!("🛑 Scheduler: shutdown signal received");
                    break;
                }
                Some(cmd) = self.commands.recv() => {
                    summary.commands += 1;
                    self.apply(cmd);
                    self.publish();
                }
                _ = interval.tick() => {
                    summary.ticks += 1;
                    if let Err(e) = self.monitor.tick().await {
                        summary.failed_ticks += 1;
                        warn!(error = %e, "Tick failed");
                    }
                    self.publish();

                    if self.max_ticks.is_some_and(|limit| summary.ticks >= limit) {
                        info!(ticks = summary.ticks, "Tick limit reached");
                        break;
                    }
                }
            }
        }

        info!("{}", summary);
        (self.monitor, summary)
    }

    fn apply(&mut self, cmd: OperatorCommand) {
        match cmd {
            OperatorCommand::Acknowledge {
                machine,
                acknowledged_by,
                notes,
                reply,
            } => {
                let result = self.monitor.acknowledge(&machine, &acknowledged_by, &notes);
                if let Err(e) = &result {
                    warn!(machine = %machine, error = %e, "Acknowledge rejected");
                }
                // Caller may have gone away
                let _ = reply.send(result);
            }
            OperatorCommand::SilenceAlarm { reply } => {
                let _ = reply.send(self.monitor.silence_alarm());
            }
        }
    }

    fn publish(&self) {
        // No receivers is fine; the handle may have been dropped
        let _ = self.snapshots.send(self.monitor.snapshot());
    }
}
