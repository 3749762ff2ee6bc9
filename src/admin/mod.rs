//! Diagnostics endpoints under `/_relay/`.
//!
//! `health` is always open; `status` sits behind the optional API key.
//! Nothing here relays to the upstream.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub const HEALTH_PATH: &str = "/_relay/health";
pub const STATUS_PATH: &str = "/_relay/status";

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route(STATUS_PATH, get(get_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .route(HEALTH_PATH, get(get_health))
        .with_state(state)
}
