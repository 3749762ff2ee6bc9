//! Response handling and transformation.
//!
//! # Responsibilities
//! - Forward the upstream answer to the client
//! - Map local errors and relay failures to status codes
//! - Render error bodies as JSON
//!
//! # Design Decisions
//! - The upstream status is forwarded unchanged, 5xx included
//! - Hop-by-hop headers stripped automatically
//! - Backend timeouts result in 504 Gateway Timeout

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::http::request::EnvelopeError;
use crate::relay::{RelayFailure, RelayResult};
use crate::security::headers::strip_hop_by_hop;

/// Everything the inbound handler can answer with instead of a relayed
/// response.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("no route for {path}")]
    NotFound { path: String },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Relay(#[from] RelayFailure),
}

impl From<EnvelopeError> for HandlerError {
    fn from(err: EnvelopeError) -> Self {
        HandlerError::Validation(err.to_string())
    }
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::NotFound { .. } => StatusCode::NOT_FOUND,
            HandlerError::Validation(_) => StatusCode::BAD_REQUEST,
            HandlerError::Relay(failure) => failure.status(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HandlerError::NotFound { .. } => "not_found",
            HandlerError::Validation(_) => "validation_error",
            HandlerError::Relay(failure) => failure.kind(),
        }
    }
}

/// JSON body of every locally generated error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.kind(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Build the client response from what the upstream answered.
pub fn relay_response(result: RelayResult) -> Response {
    let mut headers = result.headers;
    strip_hop_by_hop(&mut headers);

    let mut response = Response::new(Body::from(result.body));
    *response.status_mut() = result.status;
    *response.headers_mut() = headers;
    response
}
