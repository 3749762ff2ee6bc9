//! Supervisor token discovery.
//!
//! Home Assistant hands add-ons their API credential in several places
//! depending on the supervisor version and the s6 overlay in use. The first
//! non-empty source wins.

use std::fs;
use std::path::{Path, PathBuf};

/// Environment variables checked in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["SUPERVISOR_TOKEN", "HASSIO_TOKEN"];

/// Files checked in order once the environment came up empty.
pub const TOKEN_FILES: [&str; 4] = [
    "/run/s6/container_environment/SUPERVISOR_TOKEN",
    "/run/s6/container_environment/HASSIO_TOKEN",
    "/config/token",
    "/data/token",
];

/// Where a discovered token came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    Env(String),
    File(PathBuf),
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Env(var) => write!(f, "env:{}", var),
            TokenSource::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Look up the Supervisor token from the process environment and the
/// well-known token files.
pub fn discover_token() -> Option<(String, TokenSource)> {
    let files: Vec<&Path> = TOKEN_FILES.iter().map(Path::new).collect();
    discover_token_from(|var| std::env::var(var).ok(), &files)
}

/// Token lookup with injectable sources.
pub fn discover_token_from<F>(env: F, files: &[&Path]) -> Option<(String, TokenSource)>
where
    F: Fn(&str) -> Option<String>,
{
    for var in TOKEN_ENV_VARS {
        if let Some(token) = env(var).map(|t| t.trim().to_string()) {
            if !token.is_empty() {
                return Some((token, TokenSource::Env(var.to_string())));
            }
        }
    }

    for path in files {
        if !path.is_file() {
            continue;
        }
        match fs::read_to_string(path) {
            Ok(content) => {
                let token = content.trim();
                if !token.is_empty() {
                    return Some((token.to_string(), TokenSource::File(path.to_path_buf())));
                }
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Token file unreadable");
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "ha-relay-token-{}-{}",
            std::process::id(),
            name
        ));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn env_wins_in_order() {
        let env: HashMap<&str, &str> = [("SUPERVISOR_TOKEN", "abc"), ("HASSIO_TOKEN", "def")].into();
        let found = discover_token_from(|v| env.get(v).map(|s| s.to_string()), &[]);
        assert_eq!(
            found,
            Some(("abc".to_string(), TokenSource::Env("SUPERVISOR_TOKEN".into())))
        );
    }

    #[test]
    fn blank_env_falls_through() {
        let env: HashMap<&str, &str> = [("SUPERVISOR_TOKEN", "  "), ("HASSIO_TOKEN", "def")].into();
        let found = discover_token_from(|v| env.get(v).map(|s| s.to_string()), &[]);
        assert_eq!(found.map(|(t, _)| t), Some("def".to_string()));
    }

    #[test]
    fn reads_first_non_empty_file() {
        let empty = temp_file("empty", "\n");
        let full = temp_file("full", "  file-token\n");
        let missing = std::env::temp_dir().join("ha-relay-token-does-not-exist");

        let found = discover_token_from(|_| None, &[&missing, &empty, &full]);
        assert_eq!(
            found,
            Some(("file-token".to_string(), TokenSource::File(full.clone())))
        );

        let _ = fs::remove_file(empty);
        let _ = fs::remove_file(full);
    }

    #[test]
    fn nothing_found() {
        assert_eq!(discover_token_from(|_| None, &[]), None);
    }
}
