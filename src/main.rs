//! Machine Guard - Real-time Equipment Telemetry Monitor
//!
//! Samples every registered machine on a fixed tick, classifies each sample,
//! raises alerts for critical machines and logs a diagnostic summary.
//!
//! # Usage
//!
//! ```bash
//! # Run with built-in defaults (4 machines, 3 s tick, threshold classifier)
//! cargo run --release
//!
//! # Ten ticks, one per second, reproducible readings
//! ./machine-guard --ticks 10 --interval-ms 1000 --seed 42
//!
//! # Print the effective configuration as TOML
//! ./machine-guard --print-config
//! ```
//!
//! # Environment Variables
//!
//! - `MACHINE_GUARD_CONFIG`: Path to a TOML config file
//! - `MISTRAL_API_KEY`: Credential for the remote classifier (name configurable)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use machine_guard::config::MonitorConfig;
use machine_guard::pipeline::{Monitor, MonitorSnapshot, Scheduler};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "machine-guard")]
#[command(about = "Machine Guard real-time equipment telemetry monitor")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides MACHINE_GUARD_CONFIG and ./machine_guard.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Stop after this many ticks (default: run until Ctrl+C)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override the tick interval in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Seed the synthetic generator for reproducible runs
    #[arg(long, env = "MACHINE_GUARD_SEED")]
    seed: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn load_config(args: &CliArgs) -> Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MonitorConfig::load(),
    };

    if let Some(ms) = args.interval_ms {
        config.scheduler.tick_interval_ms = ms;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

// ============================================================================
// Snapshot Logging
// ============================================================================

fn log_snapshot(snapshot: &MonitorSnapshot) {
    for reading in &snapshot.latest {
        info!(
            machine = %reading.machine_id(),
            temperature = reading.temperature(),
            vibration = reading.vibration(),
            gas_level = reading.gas_level(),
            tier = %reading.risk_level(),
            "Reading"
        );
    }
    for alert in &snapshot.alerts {
        warn!(machine = %alert.machine_id, raised_at = %alert.timestamp, "{}", alert.message);
    }
    for line in &snapshot.insights.summary {
        info!(tick = snapshot.tick, "📊 {}", line);
    }
    for rec in &snapshot.insights.recommendations {
        info!(tick = snapshot.tick, "💡 {}", rec);
    }
    if snapshot.alarm_active {
        warn!(tick = snapshot.tick, "🚨 Alarm active");
    }
}

/// Log every published snapshot until the scheduler goes away or shutdown.
fn spawn_snapshot_logger(
    mut snapshots: tokio::sync::watch::Receiver<MonitorSnapshot>,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    log_snapshot(&snapshot);
                }
            }
        }
    })
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    let config = load_config(&args)?;

    if args.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Machine Guard - Equipment Telemetry Monitor");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        machines = ?config.machines.ids,
        interval_ms = config.scheduler.tick_interval_ms,
        seed = ?args.seed,
        "Starting monitor"
    );

    let monitor = Monitor::from_config(&config, args.seed).context("Failed to build monitor")?;

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let (scheduler, handle) =
        Scheduler::new(monitor, config.scheduler.tick_interval(), cancel_token.clone());
    let logger = spawn_snapshot_logger(handle.subscribe(), cancel_token.clone());

    let (monitor, summary) = scheduler.with_tick_limit(args.ticks).run().await;
    drop(handle);
    logger.await.context("Snapshot logger panicked")?;

    let stats = monitor.assessor_stats();
    info!(
        remote = stats.remote,
        threshold_fallback = stats.threshold_fallback,
        degraded = stats.degraded,
        transport_failures = stats.transport_failures,
        parse_failures = stats.parse_failures,
        "Classification totals"
    );
    info!("{}", summary);
    info!("✓ Machine Guard shutdown complete");
    Ok(())
}
