//! Compiled upstream target.

use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::config::UpstreamConfig;
use crate::http::request::QueryParams;
use crate::relay::outcome::RelayFailure;

/// The upstream every request is relayed to. Built once at startup and
/// shared read-only.
#[derive(Debug, Clone)]
pub struct UpstreamTarget {
    base_url: Url,
    timeout: Duration,
    connect_timeout: Duration,
    static_headers: HeaderMap,
}

impl UpstreamTarget {
    /// Compile the configured target. Errors here are fatal at startup.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, RelayFailure> {
        let base_url = Url::parse(&config.base_url).map_err(|e| RelayFailure::ConfigurationError {
            reason: format!("base_url '{}': {}", config.base_url, e),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(RelayFailure::ConfigurationError {
                reason: format!("base_url scheme '{}' is not http(s)", base_url.scheme()),
            });
        }
        if config.timeout_secs == 0 {
            return Err(RelayFailure::ConfigurationError {
                reason: "timeout_secs must be > 0".to_string(),
            });
        }

        let mut static_headers = HeaderMap::with_capacity(config.static_headers.len());
        for (name, value) in &config.static_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                RelayFailure::ConfigurationError {
                    reason: format!("invalid static header name '{}'", name),
                }
            })?;
            let mut value = HeaderValue::from_str(value).map_err(|_| {
                RelayFailure::ConfigurationError {
                    reason: format!("invalid value for static header '{}'", name),
                }
            })?;
            if name == axum::http::header::AUTHORIZATION {
                value.set_sensitive(true);
            }
            static_headers.insert(name, value);
        }

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(config.timeout_secs),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs.max(1)),
            static_headers,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn static_headers(&self) -> &HeaderMap {
        &self.static_headers
    }

    /// Join the base URL with a request path and query. Path segments of
    /// the base URL are kept, and the joined path must stay below them.
    pub fn url_for(&self, path: &str, query: &QueryParams) -> Result<Url, RelayFailure> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let mut joined = String::with_capacity(base.len() + path.len() + 1);
        joined.push_str(base);
        if !path.starts_with('/') {
            joined.push('/');
        }
        joined.push_str(path);
        if !query.is_empty() {
            joined.push('?');
            joined.push_str(&query.encode());
        }

        let url = Url::parse(&joined).map_err(|e| RelayFailure::ConfigurationError {
            reason: format!("cannot build upstream URL '{}': {}", joined, e),
        })?;

        let base_path = self.base_url.path().trim_end_matches('/');
        match url.path().strip_prefix(base_path) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => Ok(url),
            _ => Err(RelayFailure::ConfigurationError {
                reason: format!("upstream URL '{}' escapes base path '{}'", url, base_path),
            }),
        }
    }
}
