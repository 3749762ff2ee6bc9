//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default upstream: the Home Assistant Supervisor core API.
pub const DEFAULT_UPSTREAM_URL: &str = "http://supervisor/core/api";

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Upstream target the relay forwards to.
    pub upstream: UpstreamConfig,

    /// Route definitions. Requests matching no route get a 404.
    pub routes: Vec<RouteConfig>,

    /// Global method allow-list.
    pub methods: MethodsConfig,

    /// Retry configuration.
    pub retries: RetryConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Diagnostics endpoints.
    pub admin: AdminConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            upstream: UpstreamConfig::default(),
            routes: vec![RouteConfig {
                name: "core-api".to_string(),
                path: "/api/*".to_string(),
                rewrite: Some("/".to_string()),
                methods: Vec::new(),
                priority: 0,
            }],
            methods: MethodsConfig::default(),
            retries: RetryConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Maximum concurrently served requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            max_connections: 1024,
        }
    }
}

/// Upstream target configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL; request paths are appended to it.
    pub base_url: String,

    /// Per-attempt timeout in seconds (connect + response).
    pub timeout_secs: u64,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Headers attached to every outbound request. These win over inbound
    /// headers of the same name.
    pub static_headers: BTreeMap<String, String>,

    /// Look up a Supervisor token when no `Authorization` header is configured.
    pub discover_token: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_URL.to_string(),
            timeout_secs: 10,
            connect_timeout_secs: 5,
            static_headers: BTreeMap::new(),
            discover_token: true,
        }
    }
}

/// Route configuration mapping inbound paths to the upstream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Path pattern: `/status` matches exactly, `/api/*` matches the prefix.
    pub path: String,

    /// Replacement for the matched literal part of the path.
    #[serde(default)]
    pub rewrite: Option<String>,

    /// Methods accepted on this route. Empty means the global allow-list.
    #[serde(default)]
    pub methods: Vec<String>,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

impl RouteConfig {
    /// Convenience constructor used by tests and defaults.
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            rewrite: None,
            methods: Vec::new(),
            priority: 0,
        }
    }
}

/// Global method allow-list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MethodsConfig {
    pub allowed: Vec<String>,
}

impl Default for MethodsConfig {
    fn default() -> Self {
        Self {
            allowed: vec!["GET".to_string(), "POST".to_string()],
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries of transient failures.
    pub enabled: bool,

    /// Retries after the first attempt. Values above 1 are clamped to 1.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl RetryConfig {
    /// Total attempts allowed for one request (first try + retries).
    pub fn max_attempts(&self) -> u32 {
        if self.enabled {
            1 + self.max_retries.min(1)
        } else {
            1
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 1,
            base_delay_ms: 50,
            max_delay_ms: 500,
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Diagnostics endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve `/_relay/health` and `/_relay/status`.
    pub enabled: bool,

    /// Bearer token required by the diagnostics endpoints. Empty disables auth.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
        }
    }
}
