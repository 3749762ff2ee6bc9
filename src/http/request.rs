//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Enforce the body size limit
//! - Normalize the inbound request into a [`RequestEnvelope`]
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Duplicate headers collapse to the last value
//! - Repeated query keys keep every value, in order
//! - Query pairs are forwarded in their original encoding

use axum::body::{Body, Bytes};
use axum::http::{request::Parts, HeaderMap, HeaderValue, Method, Request};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

/// Header carrying the request ID to the upstream and back to the client.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Request ID for logging, `unknown` if the layer did not run.
pub fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}

/// Why an inbound request could not become an envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("failed to read request body: {0}")]
    BodyRead(String),
}

/// Query parameters in first-appearance order; repeated keys keep all values.
///
/// Each `key[=value]` pair keeps its original spelling, so encoding gives
/// back exactly what the client sent (bare keys and `%20` included),
/// grouped by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<QueryEntry>);

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueryEntry {
    /// Decoded key, used for lookup.
    key: String,
    /// Raw `key[=value]` pairs as received.
    pairs: Vec<String>,
}

impl QueryParams {
    /// Parse a raw (still percent-encoded) query string.
    pub fn parse(raw: &str) -> Self {
        let mut entries: Vec<QueryEntry> = Vec::new();
        for pair in raw.split('&').filter(|pair| !pair.is_empty()) {
            let raw_key = pair.split_once('=').map_or(pair, |(key, _)| key);
            let key = decode_component(raw_key);
            match entries.iter_mut().find(|entry| entry.key == key) {
                Some(entry) => entry.pairs.push(pair.to_string()),
                None => entries.push(QueryEntry {
                    key,
                    pairs: vec![pair.to_string()],
                }),
            }
        }
        Self(entries)
    }

    /// Decoded values of `key`; `None` marks an occurrence without `=`.
    pub fn get(&self, key: &str) -> Option<Vec<Option<String>>> {
        let entry = self.0.iter().find(|entry| entry.key == key)?;
        Some(
            entry
                .pairs
                .iter()
                .map(|pair| pair.split_once('=').map(|(_, value)| decode_component(value)))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode for the upstream request line.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .flat_map(|entry| entry.pairs.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Decode one `application/x-www-form-urlencoded` component.
fn decode_component(raw: &str) -> String {
    url::form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

/// The normalized form of one inbound request.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub query: QueryParams,
    /// `None` when the request carried no body bytes.
    pub body: Option<Bytes>,
}

impl RequestEnvelope {
    /// Buffer the body (up to `max_body_size`) and normalize the request.
    pub async fn from_request(
        request: Request<Body>,
        max_body_size: usize,
    ) -> Result<Self, EnvelopeError> {
        let (parts, body) = request.into_parts();

        if let Some(declared) = parts
            .headers
            .get(axum::http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
        {
            if declared > max_body_size {
                return Err(EnvelopeError::BodyTooLarge {
                    limit: max_body_size,
                });
            }
        }

        let collected = Limited::new(body, max_body_size)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    EnvelopeError::BodyTooLarge {
                        limit: max_body_size,
                    }
                } else {
                    EnvelopeError::BodyRead(e.to_string())
                }
            })?;
        let bytes = collected.to_bytes();

        Ok(Self::from_parts(&parts, bytes))
    }

    /// Normalize already-buffered request parts.
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        let mut headers = HeaderMap::with_capacity(parts.headers.keys_len());
        for (name, value) in parts.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            headers,
            query: parts.uri.query().map(QueryParams::parse).unwrap_or_default(),
            body: if body.is_empty() { None } else { Some(body) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn duplicate_headers_keep_last_value() {
        let parts = parts(
            Request::builder()
                .uri("/status")
                .header("X-Trace", "first")
                .header("x-trace", "second"),
        );
        let envelope = RequestEnvelope::from_parts(&parts, Bytes::new());

        assert_eq!(envelope.headers.get_all("x-trace").iter().count(), 1);
        assert_eq!(envelope.headers["X-TRACE"], "second");
    }

    #[test]
    fn repeated_query_keys_are_sequences() {
        let parts = parts(Request::builder().uri("/api/history?id=a&filter=x&id=b%20c"));
        let envelope = RequestEnvelope::from_parts(&parts, Bytes::new());

        assert_eq!(envelope.path, "/api/history");
        assert_eq!(
            envelope.query.get("id"),
            Some(vec![Some("a".to_string()), Some("b c".to_string())])
        );
        assert_eq!(envelope.query.get("filter"), Some(vec![Some("x".to_string())]));
        assert_eq!(envelope.query.encode(), "id=a&id=b%20c&filter=x");
    }

    #[test]
    fn query_pairs_keep_their_spelling() {
        let query = QueryParams::parse("verbose&name=a%20b&q=x+y&empty=&&");

        assert_eq!(query.get("verbose"), Some(vec![None]));
        assert_eq!(query.get("empty"), Some(vec![Some(String::new())]));
        assert_eq!(query.get("q"), Some(vec![Some("x y".to_string())]));
        assert_eq!(query.get("missing"), None);
        assert_eq!(query.encode(), "verbose&name=a%20b&q=x+y&empty=");
    }

    #[test]
    fn empty_body_is_absent() {
        let parts = parts(Request::builder().method(Method::POST).uri("/x"));
        let envelope = RequestEnvelope::from_parts(&parts, Bytes::new());
        assert!(envelope.body.is_none());
        assert!(envelope.query.is_empty());

        let envelope = RequestEnvelope::from_parts(&parts, Bytes::from_static(b"{}"));
        assert_eq!(envelope.body.as_deref(), Some(&b"{}"[..]));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/x")
            .body(Body::from(vec![0u8; 64]))
            .unwrap();
        let err = RequestEnvelope::from_request(request, 16).await.unwrap_err();
        assert!(matches!(err, EnvelopeError::BodyTooLarge { limit: 16 }));
    }

    #[tokio::test]
    async fn declared_length_is_checked_first() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/x")
            .header("content-length", "1000")
            .body(Body::from("tiny"))
            .unwrap();
        let err = RequestEnvelope::from_request(request, 16).await.unwrap_err();
        assert!(matches!(err, EnvelopeError::BodyTooLarge { .. }));
    }

    #[test]
    fn request_id_falls_back_to_unknown() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc"));
        assert_eq!(request_id(&headers), "abc");
    }
}
