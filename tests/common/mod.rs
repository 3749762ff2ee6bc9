//! Shared utilities for integration and load testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ha_relay::config::{RelayConfig, RouteConfig};
use ha_relay::http::HttpServer;
use ha_relay::lifecycle::Shutdown;

/// One request as the mock upstream received it.
#[derive(Debug, Clone, Default)]
pub struct Captured {
    pub method: String,
    /// Path and query, exactly as sent on the request line.
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_count(&self, name: &str) -> usize {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .count()
    }

    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or("")
    }
}

/// What the mock does with a request it has read.
#[derive(Debug, Clone)]
pub enum Reply {
    Http {
        status: u16,
        headers: Vec<(String, String)>,
        body: String,
    },
    /// Never answer.
    Hang,
    /// Answer with bytes that are not HTTP.
    Garbage,
    /// Close the connection without answering.
    Close,
    /// Never answer; count the connection once the peer closes it.
    AwaitClose,
}

impl Reply {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Reply::Http {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Reply::status(status, body).with_header("Content-Type", "application/json")
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let Reply::Http { headers, .. } = &mut self {
            headers.push((name.to_string(), value.to_string()));
        }
        self
    }
}

/// A running mock upstream.
pub struct MockUpstream {
    pub addr: SocketAddr,
    calls: Arc<AtomicU32>,
    closed: Arc<AtomicU32>,
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl MockUpstream {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests fully read so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Connections the relay closed while an `AwaitClose` reply was pending.
    pub fn closed(&self) -> u32 {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn captured(&self) -> Vec<Captured> {
        self.captured.lock().unwrap().clone()
    }

    pub fn last(&self) -> Captured {
        self.captured().pop().expect("no request reached the upstream")
    }
}

/// Start a programmable mock upstream on an ephemeral port.
///
/// `handler` gets the zero-based call index and the parsed request.
pub async fn start_upstream<F>(handler: F) -> MockUpstream
where
    F: Fn(u32, &Captured) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let calls = Arc::new(AtomicU32::new(0));
    let closed = Arc::new(AtomicU32::new(0));
    let captured = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let (task_calls, task_closed, task_captured) = (calls.clone(), closed.clone(), captured.clone());
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let calls = task_calls.clone();
            let closed = task_closed.clone();
            let captured = task_captured.clone();
            let handler = handler.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let index = calls.fetch_add(1, Ordering::SeqCst);
                captured.lock().unwrap().push(request.clone());

                match handler(index, &request) {
                    Reply::Http {
                        status,
                        headers,
                        body,
                    } => {
                        let mut response = format!("HTTP/1.1 {} Mock\r\n", status);
                        let mut has_connection = false;
                        for (name, value) in &headers {
                            has_connection |= name.eq_ignore_ascii_case("connection");
                            response.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        if !has_connection {
                            response.push_str("Connection: close\r\n");
                        }
                        response.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    Reply::Hang => {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                    Reply::Garbage => {
                        let _ = socket.write_all(b"this is not http\r\n\r\n").await;
                        let _ = socket.shutdown().await;
                    }
                    Reply::Close => {
                        drop(socket);
                    }
                    Reply::AwaitClose => {
                        let mut sink = [0u8; 1024];
                        while matches!(socket.read(&mut sink).await, Ok(n) if n > 0) {}
                        closed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
    });

    MockUpstream {
        addr,
        calls,
        closed,
        captured,
    }
}

/// Mock that always gives the same answer.
pub async fn start_fixed_upstream(reply: Reply) -> MockUpstream {
    start_upstream(move |_, _| reply.clone()).await
}

/// An address nothing listens on.
pub fn refused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn read_request(socket: &mut TcpStream) -> Option<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(Captured {
        method,
        target,
        headers,
        body,
    })
}

/// Relay configuration pointed at `base_url`, tuned for fast tests.
///
/// Routes: `/status` exact, and `/api/*` rewritten to `/`.
pub fn relay_config(base_url: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.upstream.base_url = base_url.to_string();
    config.upstream.timeout_secs = 1;
    config.upstream.connect_timeout_secs = 1;
    config.upstream.discover_token = false;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 10;

    let mut api = RouteConfig::new("api", "/api/*");
    api.rewrite = Some("/".to_string());
    config.routes = vec![RouteConfig::new("status", "/status"), api];
    config
}

/// Start the relay on an ephemeral port.
pub async fn start_relay(config: RelayConfig) -> (SocketAddr, Shutdown) {
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Send `GET <target>` with the request line written verbatim, so no
/// client normalizes the path first. Returns the raw response.
pub async fn raw_get(addr: SocketAddr, target: &str) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: relay\r\nConnection: close\r\n\r\n",
        target
    );
    socket.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    socket.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).to_string()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
