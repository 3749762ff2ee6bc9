//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms, atomic totals)
//!
//! Consumers:
//!     → Add-on log panel (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//!     → /_relay/status (atomic totals)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line of a request
//! - Counters are atomic; nothing here takes a lock

pub mod logging;
pub mod metrics;
