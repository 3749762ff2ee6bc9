//! Header manipulation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Strip headers the outbound client recomputes (Host, Content-Length)
//! - Merge static upstream headers over inbound ones
//!
//! # Design Decisions
//! - Headers listed inside `Connection` are hop-by-hop too (RFC 9110 §7.6.1)
//! - Static headers always win: they carry trusted credentials

use axum::http::header::{self, HeaderMap, HeaderName};

/// Connection-management headers that never cross the relay.
pub static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Prepare inbound headers for the upstream: drop hop-by-hop headers and
/// the ones the client recomputes, then lay static headers on top.
pub fn merge_outbound(inbound: &HeaderMap, static_headers: &HeaderMap) -> HeaderMap {
    let mut outbound = inbound.clone();
    strip_hop_by_hop(&mut outbound);
    outbound.remove(header::HOST);
    outbound.remove(header::CONTENT_LENGTH);

    for (name, value) in static_headers {
        outbound.insert(name.clone(), value.clone());
    }
    outbound
}
