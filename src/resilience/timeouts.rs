//! Timeout enforcement.
//!
//! # Responsibilities
//! - Put a hard deadline on the part of an attempt that waits for the
//!   upstream's status line
//! - Turn an elapsed deadline into `RelayFailure::Timeout`
//!
//! # Design Decisions
//! - The HTTP client enforces the configured timeout itself; this is the
//!   backstop so nothing can wait past it
//! - Dropping the timed-out future cancels the outbound call

use std::future::Future;
use std::time::Duration;

use crate::relay::RelayFailure;

/// Slack granted to the client's own timeout before the backstop fires.
pub const BACKSTOP_GRACE: Duration = Duration::from_millis(250);

/// Run `fut` under `limit` (plus [`BACKSTOP_GRACE`]).
pub async fn bounded<F, T, E>(limit: Duration, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<RelayFailure>,
{
    match tokio::time::timeout(limit + BACKSTOP_GRACE, fut).await {
        Ok(result) => result,
        Err(_) => Err(RelayFailure::Timeout { after: limit }.into()),
    }
}
