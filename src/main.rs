//! WaterMonitor - Water Level Telemetry Dashboard
//!
//! Polls gateway telemetry from a spreadsheet web app and serves sensor
//! snapshots, gateway health and raw logs over a JSON API.

mod config;
mod scheduler;
mod source;
mod telemetry;
mod web;

use config::ServerConfig;
use scheduler::{RefreshScheduler, SystemClock};
use source::SheetSource;
use web::{AppState, Server};

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("watermonitor=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load()?;
    tracing::info!("Starting WaterMonitor on port {}...", cfg.http_port);
    if !cfg.nicknames.is_empty() {
        tracing::info!("Loaded {} device nicknames", cfg.nicknames.len());
    }

    let source = SheetSource::new(&cfg.sheet_url, cfg.timeout())?;
    if source.url().is_empty() {
        tracing::warn!("WATERMONITOR_SHEET_URL is not set; refreshes will fail until it is");
    } else {
        tracing::info!("Reading telemetry from {}", source.url());
    }
    let options = cfg.derive_options();
    tracing::info!("Reading naive sheet times at UTC{}", options.time.offset());
    let clock = Arc::new(SystemClock);

    // Create and start scheduler
    let scheduler = Arc::new(RefreshScheduler::new(
        source,
        options.clone(),
        cfg.refresh_interval(),
        clock.clone(),
    ));
    scheduler.start().await;

    // Start web server
    let state = AppState {
        config: cfg,
        options: Arc::new(options),
        dashboard: scheduler.dashboard(),
        trigger: scheduler.trigger(),
        clock,
    };
    let server = Server::new(state);
    let result = server.start().await;

    scheduler.stop().await;
    result
}
