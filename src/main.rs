// Zonekeeper - Main Entry Point
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Zonekeeper - a terminal tool for managing firewalld zones.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use zonekeeper::app::Model;
use zonekeeper::backup::BackupStore;
use zonekeeper::config::Settings;
use zonekeeper::firewall::{EventSource, FirewallClient, ServiceCatalog, Subscription};
use zonekeeper::orchestrator::Executor;
use zonekeeper::runtime;
use zonekeeper::tui::{install_panic_hook, Tui};

const LOG_ENV: &str = "ZONEKEEPER_LOG";

/// Log to a file; the terminal belongs to the interface.
fn init_logging() -> Option<WorkerGuard> {
    let dir = dirs::cache_dir()?.join("zonekeeper");
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::never(dir, "zonekeeper.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

fn main() -> Result<()> {
    let _log_guard = init_logging();
    info!("Zonekeeper {} starting", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load(&Settings::default_path());

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let result = rt.block_on(run(settings));
    rt.shutdown_timeout(Duration::from_secs(1));

    if let Err(e) = &result {
        tracing::error!("Exiting with error: {:#}", e);
    }
    result
}

async fn run(settings: Settings) -> Result<()> {
    let interval = settings.min_call_interval();
    let client = tokio::task::spawn_blocking(move || FirewallClient::connect(interval))
        .await
        .context("Connection task failed")?
        .context("Failed to connect to firewalld on the system bus")?;

    let events: Option<Arc<dyn EventSource>> = match Subscription::open().await {
        Ok(subscription) => Some(Arc::new(subscription)),
        Err(e) => {
            warn!("Change notifications unavailable: {}", e);
            None
        }
    };

    let backups = BackupStore::new(
        settings.backup_dir.clone(),
        settings.zones_dir.clone(),
        settings.backup_retention,
    );
    let catalog = ServiceCatalog::new(settings.service_dirs.clone());

    let (tx, rx) = mpsc::unbounded_channel();
    let executor = Executor::new(Arc::new(client), backups, catalog, events, tx);
    let model = Model::new(&settings);

    install_panic_hook();
    let mut tui = Tui::new().context("Failed to open the terminal")?;
    tui.enter().context("Failed to prepare the terminal")?;

    let result = runtime::run(&mut tui, model, executor, rx).await;
    tui.exit();
    result
}
