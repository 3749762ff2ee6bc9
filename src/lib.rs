//! Home Assistant API relay library.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
