//! Path pattern matching.
//!
//! # Responsibilities
//! - Match exact paths (`/status`)
//! - Match literal prefixes on segment boundaries (`/api/*`)
//! - Rewrite the matched part of a path for the upstream
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching
//! - `/api/*` matches `/api` and `/api/...` but never `/apix`
//! - Paths with `.` or `..` segments are refused before matching, since
//!   URL joining would resolve them outside the routed prefix

/// A compiled route path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches one path exactly.
    Exact(String),
    /// Matches a literal prefix followed by nothing or a `/`.
    Prefix(String),
}

impl PathPattern {
    /// Compile a configured pattern. A trailing `/*` makes it a prefix pattern.
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/*") {
            Some(prefix) => PathPattern::Prefix(prefix.to_string()),
            None => PathPattern::Exact(pattern.to_string()),
        }
    }

    /// Returns true if the path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(expected) => path == expected,
            PathPattern::Prefix(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }

    /// Replace the literal part of a matching path with `replacement`.
    ///
    /// The caller must have checked [`PathPattern::matches`] first.
    pub fn rewrite(&self, path: &str, replacement: &str) -> String {
        let rest = match self {
            PathPattern::Exact(_) => "",
            PathPattern::Prefix(prefix) => &path[prefix.len().min(path.len())..],
        };
        let joined = format!("{}{}", replacement.trim_end_matches('/'), rest);
        if joined.is_empty() {
            "/".to_string()
        } else {
            joined
        }
    }
}

/// Returns true if any segment of `path` is `.` or `..`, including the
/// `%2e` spellings a URL parser treats the same way.
pub fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.replace("%2e", ".").replace("%2E", ".");
        decoded == "." || decoded == ".."
    })
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathPattern::Exact(path) => write!(f, "{}", path),
            PathPattern::Prefix(prefix) => write!(f, "{}/*", prefix),
        }
    }
}
