//! ha-relay: forwards local HTTP requests to the Home Assistant API.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request        ┌────────────────────────────────────────────────┐
//!     ──────────────────────┼─▶ http server ─▶ routing ─▶ request envelope    │
//!                           │                                 │              │
//!                           │                                 ▼              │
//!     Client Response       │                          relay client ─────────┼──▶ Supervisor /
//!     ◀─────────────────────┼── response ◀──── result | failure ◀────────────┼─── Core API
//!                           │                                                │
//!                           │  config · observability · resilience ·         │
//!                           │  security (headers) · lifecycle · admin        │
//!                           └────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use ha_relay::config::{finalize, read_config, RelayConfig};
use ha_relay::lifecycle::{signals, startup, Shutdown, StartupError};
use ha_relay::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "ha-relay", version)]
#[command(about = "Relay local HTTP requests to the Home Assistant API", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long, env = "HA_RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => read_config(path).map_err(StartupError::from)?,
        None => RelayConfig::default(),
    };
    init_logging(&config.observability).map_err(StartupError::from)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ha-relay starting");

    let config = finalize(config).map_err(StartupError::from)?;
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        timeout_secs = config.upstream.timeout_secs,
        routes = config.routes.len(),
        "Configuration loaded"
    );

    if cli.check {
        tracing::info!("Configuration is valid");
        return Ok(());
    }

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown.clone());

    startup::run(config, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
