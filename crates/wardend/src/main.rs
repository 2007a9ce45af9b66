//! wardend - time-budget enforcement daemon
//!
//! Wires the configuration, the SQLite store, the exec host adapter and the
//! controller together, restores persisted state, then runs until a signal
//! arrives. Engine events are logged as JSON lines for downstream surfaces.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use warden_core::Controller;
use warden_host_exec::ExecHost;
use warden_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use warden_util::SystemClock;

#[derive(Parser, Debug)]
#[command(name = "wardend", version, about = "Time-budget enforcement daemon")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "WARDEND_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory override (store lives here)
    #[arg(long, env = "WARDEN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log filter when RUST_LOG is not set, e.g. `info` or `wardend=debug`
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = args.config.unwrap_or_else(warden_util::default_config_path);
    let config = warden_config::load_config(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let data_dir = args.data_dir.unwrap_or_else(|| config.service.data_dir.clone());
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

    let db_path = data_dir.join("wardend.db");
    let store: Arc<dyn Store> =
        Arc::new(SqliteStore::open(&db_path).context("failed to open store")?);
    info!(db = %db_path.display(), "Store opened");

    if let Err(e) = store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted)) {
        warn!(error = %e, "Failed to record service start");
    }

    let host = Arc::new(ExecHost::new(config.host.clone()));
    let controller = Controller::new(
        store.clone(),
        host,
        Arc::new(SystemClock),
        Duration::from_millis(config.host.detect_window_ms),
    );

    spawn_event_logger(controller.subscribe());

    // Recover a persisted run before honoring auto-start; a restored
    // Blocking run re-arms its cooldown on its own.
    controller
        .restore()
        .await
        .map_err(|e| anyhow::anyhow!("restore failed: {e}"))?;

    let mode = controller.status().await.mode;
    if config.service.auto_start && !mode.is_active() {
        info!(
            target_count = config.monitor.targets.len(),
            budget_seconds = config.monitor.budget_seconds,
            "Auto-starting monitoring"
        );
        controller
            .start(config.monitor.clone())
            .await
            .map_err(|e| anyhow::anyhow!("auto-start failed: {e}"))?;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let loop_handle = tokio::spawn(controller.clone().run(shutdown_rx));

    wait_for_shutdown_signal().await?;

    shutdown_tx.send(true).ok();
    loop_handle.await.context("controller loop panicked")?;

    if let Err(e) = store.append_audit(AuditEvent::new(AuditEventType::ServiceStopped)) {
        warn!(error = %e, "Failed to record service stop");
    }
    info!("wardend stopped");
    Ok(())
}

/// Log every engine event as a JSON line
fn spawn_event_logger(mut events: broadcast::Receiver<warden_api::Event>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(event = %json, "Engine event"),
                    Err(e) => warn!(error = %e, "Failed to serialize event"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT")?;
    let mut sighup = signal(SignalKind::hangup()).context("failed to install SIGHUP")?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down");
                return Ok(());
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down");
                return Ok(());
            }
            _ = sighup.recv() => {
                info!("SIGHUP received and ignored (config reload is not supported)");
            }
        }
    }
}
