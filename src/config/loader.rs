//! Configuration loading from disk and the environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::RelayConfig;
use crate::config::token::{discover_token, TokenSource};
use crate::config::validation::{validate_config, ValidationError};

/// Overrides the listener bind address.
pub const ENV_BIND: &str = "HA_RELAY_BIND";
/// Overrides the upstream base URL.
pub const ENV_UPSTREAM_URL: &str = "HA_RELAY_UPSTREAM_URL";
/// Overrides the upstream timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "HA_RELAY_TIMEOUT_SECS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {var}")]
    InvalidOverride { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides and token discovery, then validate.
pub fn finalize(mut config: RelayConfig) -> Result<RelayConfig, ConfigError> {
    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;

    if config.upstream.discover_token {
        apply_discovered_token(&mut config, discover_token());
    }

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `HA_RELAY_*` environment overrides with an injectable lookup.
pub fn apply_env_overrides<F>(config: &mut RelayConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bind) = env(ENV_BIND) {
        config.listener.bind_address = bind;
    }
    if let Some(url) = env(ENV_UPSTREAM_URL) {
        config.upstream.base_url = url;
    }
    if let Some(raw) = env(ENV_TIMEOUT_SECS) {
        config.upstream.timeout_secs =
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride {
                    var: ENV_TIMEOUT_SECS,
                    value: raw.clone(),
                })?;
    }
    Ok(())
}

/// Install a discovered token as `Authorization: Bearer <token>` unless an
/// `Authorization` static header is already configured.
pub fn apply_discovered_token(config: &mut RelayConfig, token: Option<(String, TokenSource)>) {
    let configured = config
        .upstream
        .static_headers
        .keys()
        .any(|k| k.eq_ignore_ascii_case("authorization"));
    if configured {
        tracing::debug!("Authorization header configured explicitly, skipping token discovery");
        return;
    }

    match token {
        Some((token, source)) => {
            tracing::info!(source = %source, "Supervisor token loaded");
            config
                .upstream
                .static_headers
                .insert("authorization".to_string(), format!("Bearer {}", token));
        }
        None => {
            tracing::warn!("No Supervisor token found; relaying without credentials");
        }
    }
}
