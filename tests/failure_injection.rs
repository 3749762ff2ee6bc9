//! Failure injection tests for the relay.

use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use ha_relay::config::RelayConfig;

mod common;
use common::{client, refused_addr, relay_config, start_fixed_upstream, start_relay, start_upstream, Reply};

async fn relay_stats(relay: std::net::SocketAddr) -> serde_json::Value {
    let status: serde_json::Value = client()
        .get(format!("http://{}/_relay/status", relay))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    status["stats"].clone()
}

async fn get_status(relay: std::net::SocketAddr) -> (u16, serde_json::Value) {
    let res = client()
        .get(format!("http://{}/status", relay))
        .send()
        .await
        .expect("relay unreachable");
    let status = res.status().as_u16();
    let body = res.json().await.unwrap_or(serde_json::Value::Null);
    (status, body)
}

#[tokio::test]
async fn connection_refused_is_502_after_one_retry() {
    let config = relay_config(&format!("http://{}", refused_addr()));
    let (relay, shutdown) = start_relay(config).await;

    let (status, body) = get_status(relay).await;
    assert_eq!(status, 502);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "connection_error");

    let stats = relay_stats(relay).await;
    assert_eq!(stats["upstream_attempts"], 2);
    assert_eq!(stats["retries"], 1);
    assert_eq!(stats["failures"], 1);

    shutdown.trigger();
}

#[tokio::test]
async fn early_close_is_retried_once() {
    let upstream = start_fixed_upstream(Reply::Close).await;
    let (relay, shutdown) = start_relay(relay_config(&upstream.url())).await;

    let (status, body) = get_status(relay).await;
    assert_eq!(status, 502);
    assert_eq!(body["error"], "connection_error");
    assert_eq!(upstream.calls(), 2, "exactly one retry, never a third attempt");

    shutdown.trigger();
}

#[tokio::test]
async fn retry_recovers_from_a_single_failure() {
    let upstream = start_upstream(|index, _| {
        if index == 0 {
            Reply::Close
        } else {
            Reply::json(200, r#"{"ok": true}"#)
        }
    })
    .await;
    let (relay, shutdown) = start_relay(relay_config(&upstream.url())).await;

    let (status, body) = get_status(relay).await;
    assert_eq!(status, 200);
    assert_eq!(body["ok"], true);
    assert_eq!(upstream.calls(), 2);

    shutdown.trigger();
}

#[tokio::test]
async fn slow_upstream_is_504_after_one_retry() {
    let upstream = start_fixed_upstream(Reply::Hang).await;
    let (relay, shutdown) = start_relay(relay_config(&upstream.url())).await;

    let started = Instant::now();
    let (status, body) = get_status(relay).await;
    assert_eq!(status, 504);
    assert_eq!(body["error"], "timeout");
    assert_eq!(upstream.calls(), 2);
    // Two one-second attempts, each cut off near its deadline.
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(started.elapsed() < Duration::from_secs(5));

    shutdown.trigger();
}

#[tokio::test]
async fn garbage_response_is_502_without_retry() {
    let upstream = start_fixed_upstream(Reply::Garbage).await;
    let (relay, shutdown) = start_relay(relay_config(&upstream.url())).await;

    let (status, body) = get_status(relay).await;
    assert_eq!(status, 502);
    assert_eq!(body["error"], "invalid_response");
    assert_eq!(upstream.calls(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn retries_disabled_means_single_attempt() {
    let upstream = start_fixed_upstream(Reply::Close).await;
    let mut config: RelayConfig = relay_config(&upstream.url());
    config.retries.enabled = false;
    let (relay, shutdown) = start_relay(config).await;

    let (status, _) = get_status(relay).await;
    assert_eq!(status, 502);
    assert_eq!(upstream.calls(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn a_failing_request_does_not_affect_the_next() {
    let upstream = start_upstream(|_, request| {
        if request.path() == "/broken" {
            Reply::Garbage
        } else {
            Reply::json(200, r#"{"ok": true}"#)
        }
    })
    .await;
    let (relay, shutdown) = start_relay(relay_config(&upstream.url())).await;

    let res = client()
        .get(format!("http://{}/api/broken", relay))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    let (status, body) = get_status(relay).await;
    assert_eq!(status, 200);
    assert_eq!(body["ok"], true);

    shutdown.trigger();
}

#[tokio::test]
async fn client_disconnect_cancels_the_upstream_call() {
    let upstream = start_fixed_upstream(Reply::AwaitClose).await;
    let mut config = relay_config(&upstream.url());
    config.upstream.timeout_secs = 30;
    let (relay, shutdown) = start_relay(config).await;

    let mut socket = TcpStream::connect(relay).await.unwrap();
    socket
        .write_all(b"GET /status HTTP/1.1\r\nHost: relay\r\n\r\n")
        .await
        .unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while upstream.calls() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("request never reached the upstream");

    let dropped_at = Instant::now();
    drop(socket);

    tokio::time::timeout(Duration::from_secs(2), async {
        while upstream.closed() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("upstream connection outlived the client");
    assert!(dropped_at.elapsed() < Duration::from_secs(2));
    assert_eq!(upstream.calls(), 1, "a cancelled request is not retried");

    shutdown.trigger();
}
