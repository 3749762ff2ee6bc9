//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for log shippers, pretty format for the add-on log panel
//! - `RUST_LOG` wins over the configured level

use axum::http::Request;
use tower_http::trace::MakeSpan;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::http::request::request_id;

/// Filter used when `RUST_LOG` is not set.
pub fn default_directives(level: &str) -> String {
    format!("ha_relay={level},tower_http={level},warn", level = level)
}

/// Install the global subscriber.
pub fn init_logging(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    }
}

/// Request span carrying the request ID, so every event inside the
/// handler can be correlated.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id(request.headers()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_scope_level_to_relay() {
        assert_eq!(
            default_directives("debug"),
            "ha_relay=debug,tower_http=debug,warn"
        );
    }
}
