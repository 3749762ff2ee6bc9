//! The two possible outcomes of a relay: a result or a failure.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use thiserror::Error;

/// What the upstream answered, whatever the status.
#[derive(Debug, Clone)]
pub struct RelayResult {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Time from the first attempt to the last body byte.
    pub latency: Duration,
    /// Attempts made, 1 or 2.
    pub attempts: u32,
}

/// Closed set of ways a relay can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayFailure {
    #[error("upstream did not answer within {}s", .after.as_secs_f64())]
    Timeout { after: Duration },

    #[error("upstream unreachable: {reason}")]
    ConnectionError { reason: String },

    #[error("upstream sent an invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("upstream target misconfigured: {reason}")]
    ConfigurationError { reason: String },
}

impl RelayFailure {
    /// Stable label for logs, metrics, and error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            RelayFailure::Timeout { .. } => "timeout",
            RelayFailure::ConnectionError { .. } => "connection_error",
            RelayFailure::InvalidResponse { .. } => "invalid_response",
            RelayFailure::ConfigurationError { .. } => "configuration_error",
        }
    }

    /// Status the inbound handler answers with.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayFailure::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RelayFailure::ConnectionError { .. }
            | RelayFailure::InvalidResponse { .. }
            | RelayFailure::ConfigurationError { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Failures that may clear up on a second try.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RelayFailure::Timeout { .. } | RelayFailure::ConnectionError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_status_mapping() {
        let timeout = RelayFailure::Timeout {
            after: Duration::from_secs(10),
        };
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(timeout.is_transient());
        assert_eq!(timeout.to_string(), "upstream did not answer within 10s");

        let refused = RelayFailure::ConnectionError {
            reason: "refused".into(),
        };
        assert_eq!(refused.status(), StatusCode::BAD_GATEWAY);
        assert!(refused.is_transient());

        let garbage = RelayFailure::InvalidResponse {
            reason: "bad status line".into(),
        };
        assert_eq!(garbage.status(), StatusCode::BAD_GATEWAY);
        assert!(!garbage.is_transient());

        let config = RelayFailure::ConfigurationError {
            reason: "bad url".into(),
        };
        assert_eq!(config.status(), StatusCode::BAD_GATEWAY);
        assert!(!config.is_transient());
        assert_eq!(config.kind(), "configuration_error");
    }
}
