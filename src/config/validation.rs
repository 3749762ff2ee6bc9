//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check the upstream URL and static headers can actually be used
//! - Check route patterns and method names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue, Method};
use thiserror::Error;
use url::Url;

use crate::config::schema::RelayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `upstream.base_url`.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Methods the relay knows how to forward.
const SUPPORTED_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

/// Parse a configured method name (case-insensitive).
pub fn parse_method(name: &str) -> Option<Method> {
    let upper = name.trim().to_ascii_uppercase();
    SUPPORTED_METHODS
        .iter()
        .find(|m| m.as_str() == upper)
        .cloned()
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be > 0"));
    }

    validate_upstream(config, &mut errors);
    validate_methods(config, &mut errors);
    validate_routes(config, &mut errors);

    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }
    if config.limits.max_body_size == 0 {
        errors.push(ValidationError::new("limits.max_body_size", "must be > 0"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_upstream(config: &RelayConfig, errors: &mut Vec<ValidationError>) {
    let upstream = &config.upstream;

    match Url::parse(&upstream.base_url) {
        Ok(url) => {
            if !matches!(url.scheme(), "http" | "https") {
                errors.push(ValidationError::new(
                    "upstream.base_url",
                    format!("unsupported scheme '{}'", url.scheme()),
                ));
            }
            if url.host_str().is_none() {
                errors.push(ValidationError::new("upstream.base_url", "missing host"));
            }
            if url.query().is_some() || url.fragment().is_some() {
                errors.push(ValidationError::new(
                    "upstream.base_url",
                    "must not carry a query or fragment",
                ));
            }
        }
        Err(e) => errors.push(ValidationError::new(
            "upstream.base_url",
            format!("'{}' is not a URL: {}", upstream.base_url, e),
        )),
    }

    if upstream.timeout_secs == 0 {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be > 0"));
    }
    if upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "upstream.connect_timeout_secs",
            "must be > 0",
        ));
    }

    for (name, value) in &upstream.static_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                format!("upstream.static_headers.{}", name),
                "invalid header name",
            ));
        }
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::new(
                format!("upstream.static_headers.{}", name),
                "invalid header value",
            ));
        }
    }
}

fn validate_methods(config: &RelayConfig, errors: &mut Vec<ValidationError>) {
    if config.methods.allowed.is_empty() {
        errors.push(ValidationError::new("methods.allowed", "must not be empty"));
    }
    for name in &config.methods.allowed {
        if parse_method(name).is_none() {
            errors.push(ValidationError::new(
                "methods.allowed",
                format!("unsupported method '{}'", name),
            ));
        }
    }
}

fn validate_routes(config: &RelayConfig, errors: &mut Vec<ValidationError>) {
    if config.routes.is_empty() {
        errors.push(ValidationError::new(
            "routes",
            "at least one route is required; nothing could ever be relayed",
        ));
    }

    let mut names = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{}]", i);

        if route.name.is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
        } else if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate route name '{}'", route.name),
            ));
        }

        if !route.path.starts_with('/') {
            errors.push(ValidationError::new(
                format!("{}.path", field),
                "must start with '/'",
            ));
        }
        let wildcard_ok = match route.path.find('*') {
            None => true,
            Some(pos) => pos == route.path.len() - 1 && route.path.ends_with("/*"),
        };
        if !wildcard_ok {
            errors.push(ValidationError::new(
                format!("{}.path", field),
                "'*' is only allowed as a trailing '/*'",
            ));
        }

        if let Some(rewrite) = &route.rewrite {
            if !rewrite.starts_with('/') {
                errors.push(ValidationError::new(
                    format!("{}.rewrite", field),
                    "must start with '/'",
                ));
            }
        }

        for name in &route.methods {
            if parse_method(name).is_none() {
                errors.push(ValidationError::new(
                    format!("{}.methods", field),
                    format!("unsupported method '{}'", name),
                ));
            }
        }
    }
}
