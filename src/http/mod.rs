//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, concurrency limit)
//!     → [routing decides the route, or 404]
//!     → request.rs (body limit, normalize into RequestEnvelope)
//!     → [relay client calls the upstream]
//!     → response.rs (forward upstream answer, or JSON error)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, QueryParams, RequestEnvelope, X_REQUEST_ID};
pub use response::HandlerError;
pub use server::{AppState, HttpServer};
