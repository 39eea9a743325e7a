//! Conduit Daemon - Main entry point
//!
//! Brings up the configured simulated devices, binds a channel to every
//! supported cluster and logs the events they publish.

mod config;
mod state;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "conduit")]
#[command(about = "HVAC cluster channel daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "conduit.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configure all channels, print their cached state as JSON and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Conduit v{}", env!("CARGO_PKG_VERSION"));

    let config = config::load_config(&args.config)?;
    info!(
        devices = config.devices.len(),
        timeout_ms = config.daemon.response_timeout_ms,
        "Configuration loaded"
    );

    let state = state::AppState::new(&config);
    let watchers = state.watch_events();
    let listeners = state.start_listeners();

    state.configure_all().await?;

    if args.once {
        println!("{}", serde_json::to_string_pretty(&state.snapshot())?);
    } else {
        info!(
            devices = state.devices.len(),
            channels = state.channels.len(),
            "Running, press Ctrl-C to stop"
        );
        tokio::signal::ctrl_c().await?;
        info!("Shutting down");
    }

    for handle in listeners.into_iter().chain(watchers) {
        handle.abort();
    }

    Ok(())
}
