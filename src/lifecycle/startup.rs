//! Startup orchestration.
//!
//! # Responsibilities
//! - Start the metrics exporter when enabled
//! - Build the server from the validated configuration
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::io;
use std::net::SocketAddr;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing_subscriber::util::TryInitError;

use crate::config::{ConfigError, ListenerConfig, ObservabilityConfig, RelayConfig};
use crate::http::HttpServer;
use crate::observability::metrics::init_metrics;
use crate::relay::RelayFailure;

/// Errors that stop the relay before it serves a request.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid upstream: {0}")]
    Upstream(#[from] RelayFailure),

    #[error("failed to install logging: {0}")]
    Logging(#[from] TryInitError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),

    #[error("invalid {field} '{value}'")]
    Address { field: &'static str, value: String },

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

/// Bind the inbound listener.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, StartupError> {
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .map_err(|_| StartupError::Address {
            field: "listener.bind_address",
            value: config.bind_address.clone(),
        })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.bind_address.clone(),
            source,
        })?;

    tracing::info!(
        address = %listener.local_addr().unwrap_or(addr),
        max_connections = config.max_connections,
        "Listening for connections"
    );
    Ok(listener)
}

/// Install the Prometheus exporter if metrics are enabled.
pub fn start_metrics(config: &ObservabilityConfig) -> Result<(), StartupError> {
    if !config.metrics_enabled {
        return Ok(());
    }
    let addr: SocketAddr = config
        .metrics_address
        .parse()
        .map_err(|_| StartupError::Address {
            field: "observability.metrics_address",
            value: config.metrics_address.clone(),
        })?;
    init_metrics(addr)?;
    Ok(())
}

/// Run the relay until `shutdown` fires.
pub async fn run(
    config: RelayConfig,
    shutdown: broadcast::Receiver<()>,
) -> Result<(), StartupError> {
    start_metrics(&config.observability)?;

    let server = HttpServer::new(config)?;
    let listener = bind(&server.config().listener).await?;

    server
        .run(listener, shutdown)
        .await
        .map_err(StartupError::Serve)
}
