//! T100 thruster feedback poller.
//!
//! Polls the feedback registers of each configured thruster ESC over the
//! shared I2C bus and emits unit-converted telemetry samples as
//! newline-delimited records on stdout.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::{info, warn};

use t100_feedback::bus::I2cBus;
use t100_feedback::config::FeedbackConfig;
use t100_feedback::liveness::LivenessTracker;
use t100_feedback::poller::ThrusterPoller;
use t100_feedback::sink::{TelemetrySink, WriterSink};
use t100_telemetry_common::LoggingConfig;

/// Polls T100 thruster ESCs over I2C and emits telemetry.
#[derive(Parser, Debug)]
#[command(name = "t100-feedback")]
#[command(about = "Polls T100 thruster feedback registers and emits telemetry")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "t100.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = FeedbackConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    let log_config = LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: config.logging.format,
    };
    t100_telemetry_common::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!("Starting t100-feedback");
    info!("Loaded configuration from {:?}", args.config);

    // One adapter handle shared by every poller; the mutex serializes
    // all transactions on the bus.
    let bus = I2cBus::open(&config.bus.device)
        .with_context(|| format!("Failed to open I2C adapter '{}'", config.bus.device))?;
    let bus = Arc::new(Mutex::new(bus));

    let sink: Arc<dyn TelemetrySink> =
        Arc::new(WriterSink::new(std::io::stdout(), config.serialization));
    let liveness = Arc::new(Mutex::new(LivenessTracker::new()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start one poller task per thruster
    let mut tasks = Vec::new();

    for thruster in &config.thrusters {
        let poller = ThrusterPoller::new(thruster, bus.clone(), config.on_disconnect);

        info!(
            "Starting poller for thruster '{}' (address 0x{:02x})",
            thruster.name, thruster.address
        );

        let sink = sink.clone();
        let liveness = liveness.clone();
        let shutdown = shutdown_rx.clone();
        let rate_hz = config.poll_rate_hz;

        tasks.push(tokio::spawn(async move {
            poller.run(rate_hz, sink, liveness, shutdown).await;
        }));
    }

    info!(
        "Feedback poller running with {} thruster(s) at {} Hz",
        config.thrusters.len(),
        config.poll_rate_hz
    );

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    // Ask pollers to exit between ticks and wait for them
    let _ = shutdown_tx.send(true);
    for task in tasks {
        if let Err(e) = task.await {
            warn!("Poller task failed to join: {}", e);
        }
    }

    // Final liveness report
    let snapshot = {
        let tracker = liveness.lock().unwrap_or_else(|p| p.into_inner());
        tracker.snapshot()
    };
    match serde_json::to_string(&snapshot) {
        Ok(report) => info!("Final liveness: {}", report),
        Err(e) => warn!("Failed to serialize liveness report: {}", e),
    }

    info!("Feedback poller stopped");

    Ok(())
}
