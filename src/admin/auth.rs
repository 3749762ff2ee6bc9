use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::server::AppState;

/// Require `Authorization: Bearer <admin.api_key>` when a key is configured.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let expected = state.config.admin.api_key.as_str();
    if expected.is_empty() {
        return Ok(next.run(request).await);
    }

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented.is_some_and(|key| keys_match(key.as_bytes(), expected.as_bytes())) {
        return Ok(next.run(request).await);
    }

    tracing::warn!(path = %request.uri().path(), "Rejected diagnostics request");
    Err(StatusCode::UNAUTHORIZED)
}

/// Compare two keys in time that depends only on their lengths.
fn keys_match(presented: &[u8], expected: &[u8]) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
