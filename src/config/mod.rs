//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, HA_RELAY_* overrides)
//!     → token.rs (Supervisor token → Authorization header)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod token;
pub mod validation;

pub use loader::{finalize, load_config, read_config, ConfigError};
pub use schema::{
    AdminConfig, ListenerConfig, LogFormat, MethodsConfig, ObservabilityConfig, RelayConfig,
    RetryConfig, RouteConfig, UpstreamConfig,
};
