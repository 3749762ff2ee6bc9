//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → headers.rs (strip hop-by-hop, merge static credentials)
//!     → Relay to upstream
//!
//! Upstream response:
//!     → headers.rs (strip hop-by-hop)
//!     → Client
//! ```
//!
//! # Design Decisions
//! - Credentials come from configuration, never from the client
//! - No connection-management header crosses the relay

pub mod headers;
