use axum::{extract::State, http::header::AUTHORIZATION, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::observability::metrics::StatsSnapshot;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UpstreamStatus {
    pub base_url: String,
    pub timeout_secs: u64,
    pub credential_configured: bool,
    /// Length of the credential, never the credential itself.
    pub credential_length: usize,
}

#[derive(Debug, Serialize)]
pub struct RouteStatus {
    pub name: String,
    pub path: String,
    pub methods: Vec<String>,
    pub priority: u32,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub upstream: UpstreamStatus,
    pub routes: Vec<RouteStatus>,
    pub stats: StatsSnapshot,
}

pub async fn get_health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let target = state.relay.target();

    let credential_length = target
        .static_headers()
        .get(AUTHORIZATION)
        .map(|value| {
            let raw = value.as_bytes();
            raw.strip_prefix(b"Bearer ").unwrap_or(raw).len()
        })
        .unwrap_or(0);

    let routes = state
        .router
        .routes()
        .iter()
        .map(|route| RouteStatus {
            name: route.name.clone(),
            path: route.pattern.to_string(),
            methods: route.methods.iter().map(|m| m.to_string()).collect(),
            priority: route.priority,
        })
        .collect();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        upstream: UpstreamStatus {
            base_url: target.base_url().to_string(),
            timeout_secs: target.timeout().as_secs(),
            credential_configured: credential_length > 0,
            credential_length,
        },
        routes,
        stats: state.relay.stats().snapshot(),
    })
}
