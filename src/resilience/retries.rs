//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failed attempt is retried
//! - Space the retry with jittered backoff
//!
//! # Design Decisions
//! - At most one retry per request
//! - Only transient failures (timeout, connection refused/reset) retry
//! - Never retry once the upstream produced a status line: a 500 is an
//!   answer, not a failure

use std::time::Duration;

use crate::config::RetryConfig;
use crate::relay::RelayFailure;
use crate::resilience::backoff::retry_delay;

/// A failed attempt, with whether the upstream already sent a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptError {
    pub failure: RelayFailure,
    pub status_received: bool,
}

impl AttemptError {
    /// Failed before any status line arrived.
    pub fn before_status(failure: RelayFailure) -> Self {
        Self {
            failure,
            status_received: false,
        }
    }

    /// Failed while reading the body of a response that had a status.
    pub fn after_status(failure: RelayFailure) -> Self {
        Self {
            failure,
            status_received: true,
        }
    }
}

impl From<RelayFailure> for AttemptError {
    fn from(failure: RelayFailure) -> Self {
        Self::before_status(failure)
    }
}

/// Returns true if a failed attempt may be retried.
pub fn is_retryable(error: &AttemptError) -> bool {
    !error.status_received && error.failure.is_transient()
}

/// Retry policy compiled from configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts(),
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether attempt number `attempt` (1-based) may be followed by another.
    pub fn should_retry(&self, attempt: u32, error: &AttemptError) -> bool {
        attempt < self.max_attempts && is_retryable(error)
    }

    /// Delay before the attempt following attempt number `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        retry_delay(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}
