//! Outbound relay client.
//!
//! # Responsibilities
//! - Build the outbound request from a [`RequestEnvelope`]
//! - Enforce the per-attempt timeout
//! - Retry a transient failure once
//! - Classify client errors into the closed [`RelayFailure`] set
//!
//! # Cancellation
//!
//! Nothing here is spawned. If the inbound connection goes away, hyper drops
//! the handler future, which drops the in-flight `send()` and the retry
//! sleep with it; no partial result is delivered anywhere.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::http::request::{request_id, RequestEnvelope};
use crate::observability::metrics::{self, RelayStats};
use crate::relay::outcome::{RelayFailure, RelayResult};
use crate::relay::state::{RelayLifecycle, RelayState};
use crate::relay::target::UpstreamTarget;
use crate::resilience::timeouts::bounded;
use crate::resilience::{AttemptError, RetryPolicy};
use crate::security::headers::merge_outbound;

/// Relays envelopes to the upstream target.
///
/// Cheap to clone; clones share the connection pool, the target, and the
/// counters.
#[derive(Debug, Clone)]
pub struct RelayClient {
    client: reqwest::Client,
    target: Arc<UpstreamTarget>,
    policy: RetryPolicy,
    stats: Arc<RelayStats>,
}

struct UpstreamResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl RelayClient {
    /// Create a client for `target`.
    ///
    /// Redirects are passed through to the caller rather than followed, and
    /// proxy environment variables are ignored.
    pub fn new(target: UpstreamTarget, policy: RetryPolicy) -> Result<Self, RelayFailure> {
        let client = reqwest::Client::builder()
            .timeout(target.timeout())
            .connect_timeout(target.connect_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RelayFailure::ConfigurationError {
                reason: format!("cannot build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            target: Arc::new(target),
            policy,
            stats: Arc::new(RelayStats::default()),
        })
    }

    pub fn target(&self) -> &UpstreamTarget {
        &self.target
    }

    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Relay an already validated envelope.
    pub async fn relay(&self, envelope: &RequestEnvelope) -> Result<RelayResult, RelayFailure> {
        let mut lifecycle = RelayLifecycle::validated();
        self.relay_tracked(envelope, &mut lifecycle).await
    }

    /// Relay an envelope, driving `lifecycle` from `Validated` to a terminal
    /// state.
    pub async fn relay_tracked(
        &self,
        envelope: &RequestEnvelope,
        lifecycle: &mut RelayLifecycle,
    ) -> Result<RelayResult, RelayFailure> {
        let request_id = request_id(&envelope.headers);
        let start = Instant::now();

        lifecycle.transition(RelayState::Relaying, &request_id);

        let url = match self.target.url_for(&envelope.path, &envelope.query) {
            Ok(url) => url,
            Err(failure) => {
                tracing::error!(request_id = %request_id, error = %failure, "Cannot build upstream URL");
                lifecycle.transition(RelayState::Failed, &request_id);
                self.stats.record_failure();
                metrics::record_failure(failure.kind());
                return Err(failure);
            }
        };
        let headers = merge_outbound(&envelope.headers, self.target.static_headers());

        let mut attempt = 1;
        loop {
            tracing::debug!(
                request_id = %request_id,
                method = %envelope.method,
                url = %url,
                attempt,
                "Relaying to upstream"
            );

            match self
                .send_once(&envelope.method, &url, &headers, envelope.body.as_ref())
                .await
            {
                Ok(response) => {
                    lifecycle.transition(RelayState::Succeeded, &request_id);
                    let latency = start.elapsed();
                    tracing::info!(
                        request_id = %request_id,
                        status = %response.status,
                        attempts = attempt,
                        latency_ms = latency.as_millis() as u64,
                        "Upstream answered"
                    );
                    return Ok(RelayResult {
                        status: response.status,
                        headers: response.headers,
                        body: response.body,
                        latency,
                        attempts: attempt,
                    });
                }
                Err(err) => {
                    if self.policy.should_retry(attempt, &err)
                        && lifecycle.advance(RelayState::Retrying).is_ok()
                    {
                        let delay = self.policy.delay(attempt);
                        tracing::warn!(
                            request_id = %request_id,
                            attempt,
                            kind = err.failure.kind(),
                            error = %err.failure,
                            delay = ?delay,
                            "Transient upstream failure, retrying"
                        );
                        self.stats.record_retry();
                        metrics::record_retry(err.failure.kind());
                        tokio::time::sleep(delay).await;

                        lifecycle.transition(RelayState::Relaying, &request_id);
                        attempt += 1;
                        continue;
                    }

                    tracing::error!(
                        request_id = %request_id,
                        attempts = attempt,
                        kind = err.failure.kind(),
                        error = %err.failure,
                        "Upstream relay failed"
                    );
                    lifecycle.transition(RelayState::Failed, &request_id);
                    self.stats.record_failure();
                    metrics::record_failure(err.failure.kind());
                    return Err(err.failure);
                }
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        headers: &HeaderMap,
        body: Option<&Bytes>,
    ) -> Result<UpstreamResponse, AttemptError> {
        self.stats.record_attempt();

        let timeout = self.target.timeout();
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .headers(headers.clone());
        if let Some(body) = body {
            request = request.body(body.clone());
        }

        let response = bounded(timeout, async {
            request
                .send()
                .await
                .map_err(|e| AttemptError::before_status(classify(&e, timeout)))
        })
        .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptError::after_status(classify(&e, timeout)))?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

/// Map a client error onto the closed failure set.
fn classify(error: &reqwest::Error, timeout: Duration) -> RelayFailure {
    let reason = describe(error);

    if error.is_timeout() {
        return RelayFailure::Timeout { after: timeout };
    }
    if error.is_connect() {
        return RelayFailure::ConnectionError { reason };
    }
    if error.is_builder() {
        return RelayFailure::ConfigurationError { reason };
    }

    if let Some(hyper_err) = find_source::<hyper::Error>(error) {
        if hyper_err.is_parse() || hyper_err.is_parse_status() || hyper_err.is_parse_too_large() {
            return RelayFailure::InvalidResponse { reason };
        }
        if hyper_err.is_timeout() {
            return RelayFailure::Timeout { after: timeout };
        }
        if hyper_err.is_incomplete_message() || hyper_err.is_canceled() || hyper_err.is_closed() {
            return RelayFailure::ConnectionError { reason };
        }
    }

    if let Some(io_err) = find_source::<std::io::Error>(error) {
        use std::io::ErrorKind;
        match io_err.kind() {
            ErrorKind::TimedOut => return RelayFailure::Timeout { after: timeout },
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => return RelayFailure::ConnectionError { reason },
            _ => {}
        }
    }

    if error.is_decode() || error.is_body() {
        return RelayFailure::InvalidResponse { reason };
    }

    RelayFailure::ConnectionError { reason }
}

fn find_source<'a, E>(error: &'a (dyn std::error::Error + 'static)) -> Option<&'a E>
where
    E: std::error::Error + 'static,
{
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(found) = err.downcast_ref::<E>() {
            return Some(found);
        }
        source = err.source();
    }
    None
}

/// Error message with its source chain, `outer: inner: root`.
fn describe(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(err) = source {
        message.push_str(": ");
        message.push_str(&err.to_string());
        source = err.source();
    }
    message
}
