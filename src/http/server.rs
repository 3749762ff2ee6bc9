//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: diagnostics routes plus the relay fallback
//! - Wire up middleware (request ID, tracing, concurrency limit)
//! - Dispatch requests through route lookup, validation, and the relay
//! - Serve until the shutdown signal, then drain

use std::io;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::admin::setup_admin_router;
use crate::config::RelayConfig;
use crate::http::request::{request_id, MakeRequestUuid, RequestEnvelope};
use crate::http::response::{relay_response, HandlerError};
use crate::lifecycle::{shutdown, StartupError};
use crate::observability::logging::RequestSpan;
use crate::observability::metrics;
use crate::relay::{RelayClient, RelayLifecycle, RelayResult, RelayState, UpstreamTarget};
use crate::resilience::RetryPolicy;
use crate::routing::{has_dot_segment, Route, RouteMatch, Router as RouteTable};

/// Route label for requests that matched no route.
const UNROUTED: &str = "none";

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub router: Arc<RouteTable>,
    pub relay: RelayClient,
    pub config: Arc<RelayConfig>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    app: axum::Router,
    state: AppState,
}

impl HttpServer {
    /// Build the server from a validated configuration.
    ///
    /// Fails when the upstream target cannot be constructed; no request
    /// could ever succeed in that case.
    pub fn new(config: RelayConfig) -> Result<Self, StartupError> {
        let target = UpstreamTarget::from_config(&config.upstream)?;
        let policy = RetryPolicy::from_config(&config.retries);
        let relay = RelayClient::new(target, policy)?;
        let router = Arc::new(RouteTable::from_config(&config.routes, &config.methods));

        for route in router.routes() {
            tracing::info!(
                route = %route.name,
                path = %route.pattern,
                methods = ?route.methods,
                rewrite = route.rewrite.as_deref().unwrap_or("-"),
                "Route registered"
            );
        }

        let state = AppState {
            router,
            relay,
            config: Arc::new(config),
        };
        let app = Self::build_router(state.clone());

        Ok(Self { app, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> axum::Router {
        let relay = axum::Router::new()
            .fallback(relay_handler)
            .with_state(state.clone());

        let app = if state.config.admin.enabled {
            setup_admin_router(state.clone()).merge(relay)
        } else {
            relay
        };

        app.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(GlobalConcurrencyLimitLayer::new(
                    state.config.listener.max_connections,
                )),
        )
    }

    /// The fully layered router, for driving requests without a socket.
    pub fn router(&self) -> axum::Router {
        self.app.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &RelayConfig {
        &self.state.config
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight
    /// requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.state.relay.target().base_url(),
            "HTTP server starting"
        );

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Relay handler: every request that is not a diagnostics route ends here.
async fn relay_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let request_id = request_id(request.headers());
    state.relay.stats().record_request();

    let (route, outcome) = dispatch(&state, request, &request_id).await;

    let response = match outcome {
        Ok(result) => relay_response(result),
        Err(err) => err.into_response(),
    };

    let label = route.map(|r| r.name.as_str()).unwrap_or(UNROUTED);
    metrics::record_request(&method, response.status().as_u16(), label, start);
    response
}

/// Route lookup, validation, then the relay itself.
async fn dispatch<'a>(
    state: &'a AppState,
    request: Request<Body>,
    request_id: &str,
) -> (Option<&'a Route>, Result<RelayResult, HandlerError>) {
    let mut lifecycle = RelayLifecycle::new();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if has_dot_segment(&path) {
        tracing::warn!(request_id = %request_id, path = %path, "Dot segment in path");
        state.relay.stats().record_rejected();
        lifecycle.transition(RelayState::Failed, request_id);
        let err = HandlerError::Validation(format!("path {} contains a dot segment", path));
        return (None, Err(err));
    }

    let route = match state.router.match_route(&method, &path) {
        RouteMatch::Matched(route) => route,
        RouteMatch::NotFound => {
            tracing::warn!(request_id = %request_id, path = %path, "No route matched");
            state.relay.stats().record_not_found();
            return (None, Err(HandlerError::NotFound { path }));
        }
        RouteMatch::MethodNotAllowed { path_routes } => {
            tracing::warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                "Method not allowed"
            );
            state.relay.stats().record_rejected();
            lifecycle.transition(RelayState::Failed, request_id);
            let err = HandlerError::Validation(format!(
                "method {} is not allowed for {}",
                method, path
            ));
            return (path_routes.first().copied(), Err(err));
        }
    };

    let mut envelope =
        match RequestEnvelope::from_request(request, state.config.limits.max_body_size).await {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Request rejected");
                state.relay.stats().record_rejected();
                lifecycle.transition(RelayState::Failed, request_id);
                return (Some(route), Err(e.into()));
            }
        };
    lifecycle.transition(RelayState::Validated, request_id);

    envelope.path = route.upstream_path(&envelope.path);
    tracing::debug!(
        request_id = %request_id,
        route = %route.name,
        upstream_path = %envelope.path,
        "Request validated"
    );

    let outcome = state
        .relay
        .relay_tracked(&envelope, &mut lifecycle)
        .await
        .map_err(HandlerError::from);
    (Some(route), outcome)
}
