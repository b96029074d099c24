use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

mod api;
mod config;
mod engine;
mod error;
mod models;
mod notify;
mod probe;
mod scheduler;

use crate::config::{listen_port, NotifierConfig};
use crate::engine::Monitor;
use crate::scheduler::{Cadence, Scheduler};

#[derive(Debug, Parser)]
#[command(name = "healthcheck-notifier", version, about)]
struct Args {
    /// Path to the JSON configuration file.
    #[arg(short, long, env = "HEALTHCHECK_CONFIG", default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into()))
        .with_ansi(true)
        .init();

    let args = Args::parse();
    let config = NotifierConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let cadence = Cadence::parse(&config.cron).context("Failed to parse cron schedule")?;
    let port = listen_port(std::env::var("PORT").ok()).context("Failed to resolve listen port")?;

    let monitor = Arc::new(Monitor::new(config).context("Failed to initialize monitor")?);

    let sweeper = Arc::clone(&monitor);
    tokio::spawn(Scheduler::new(cadence).run(move || {
        let monitor = Arc::clone(&sweeper);
        async move {
            monitor.sweep().await;
        }
    }));

    tokio::select! {
        res = api::start_server(port, Arc::clone(&monitor)) => {
            res.context("Dashboard server failed")?;
        }
        res = signal::ctrl_c() => {
            res?;
            info!("Shutdown signal received. Closing healthcheck notifier...");
        }
    }

    Ok(())
}
