//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up matching route for a method and path
//! - Return matched route, method rejection, or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan ordered by priority (acceptable for typical route counts)
//! - Explicit NotFound rather than silent default

use axum::http::Method;

use crate::config::validation::parse_method;
use crate::config::{MethodsConfig, RouteConfig};
use crate::routing::matcher::PathPattern;

/// A compiled route.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: String,
    pub pattern: PathPattern,
    pub rewrite: Option<String>,
    pub methods: Vec<Method>,
    pub priority: u32,
}

impl Route {
    /// Path to request on the upstream for an inbound path matching this route.
    pub fn upstream_path(&self, path: &str) -> String {
        match &self.rewrite {
            Some(replacement) => self.pattern.rewrite(path, replacement),
            None => path.to_string(),
        }
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }
}

/// Outcome of a route lookup.
#[derive(Debug)]
pub enum RouteMatch<'a> {
    /// A route accepts this method and path.
    Matched(&'a Route),
    /// The path is routed, but no matching route accepts the method.
    MethodNotAllowed { path_routes: Vec<&'a Route> },
    /// No route matches the path.
    NotFound,
}

/// Immutable route table built once at startup.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile routes. Routes without their own method list get the global
    /// allow-list. Higher priority is checked first; ties keep config order.
    pub fn from_config(routes: &[RouteConfig], global: &MethodsConfig) -> Self {
        let global_methods: Vec<Method> = global
            .allowed
            .iter()
            .filter_map(|m| parse_method(m))
            .collect();

        let mut compiled: Vec<Route> = routes
            .iter()
            .map(|config| {
                let methods = if config.methods.is_empty() {
                    global_methods.clone()
                } else {
                    config.methods.iter().filter_map(|m| parse_method(m)).collect()
                };
                Route {
                    name: config.name.clone(),
                    pattern: PathPattern::parse(&config.path),
                    rewrite: config.rewrite.clone(),
                    methods,
                    priority: config.priority,
                }
            })
            .collect();

        compiled.sort_by(|a, b| b.priority.cmp(&a.priority));

        Self { routes: compiled }
    }

    /// Find the route for a request.
    pub fn match_route(&self, method: &Method, path: &str) -> RouteMatch<'_> {
        let mut path_routes = Vec::new();
        for route in self.routes.iter().filter(|r| r.pattern.matches(path)) {
            if route.allows(method) {
                return RouteMatch::Matched(route);
            }
            path_routes.push(route);
        }

        if path_routes.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed { path_routes }
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}
