//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate path pattern)
//!     → Return: Matched route, MethodNotAllowed, or NotFound
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Resolve method lists against the global allow-list
//!     → Sort by priority
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (exact and prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by priority)

pub mod matcher;
pub mod router;

pub use matcher::{has_dot_segment, PathPattern};
pub use router::{Route, RouteMatch, Router};
