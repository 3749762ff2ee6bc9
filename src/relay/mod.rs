//! Relay subsystem.
//!
//! # Data Flow
//! ```text
//! RequestEnvelope (validated, path rewritten)
//!     → target.rs (base URL + path + query, static headers)
//!     → client.rs (send, timeout, one retry on transient failure)
//!     → outcome.rs (RelayResult | RelayFailure)
//!
//! state.rs tracks Received → Validated → Relaying → {Succeeded, Retrying, Failed}
//! ```
//!
//! # Design Decisions
//! - The target is immutable and shared read-only
//! - Failures form a closed set; each maps to exactly one status
//! - Upstream statuses are answers, never failures

pub mod client;
pub mod outcome;
pub mod state;
pub mod target;

pub use client::RelayClient;
pub use outcome::{RelayFailure, RelayResult};
pub use state::{InvalidTransition, RelayLifecycle, RelayState};
pub use target::UpstreamTarget;
