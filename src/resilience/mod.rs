//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt to upstream:
//!     → timeouts.rs (deadline on the wait for a status line)
//!     → On failure: retries.rs (retryable? one retry with backoff.rs delay)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - One retry at most, and only before a status line was received
//! - Retrying is decided per attempt, not per method

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{is_retryable, AttemptError, RetryPolicy};
