//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use hls_relay::codec::{self, HeaderBag, ProxyEndpoint};
use hls_relay::dispatch::UnavailableFtp;
use hls_relay::fetch::{Fetch, FetchError, FetchRequest, OriginBody, OriginResponse};
use hls_relay::{HttpServer, RelayConfig, Shutdown};

pub const AUTH: &str = "test-code";

/// A request as the mock origin saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the mock origin answers.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn ok(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::status(200, body).with_header("Content-Type", content_type)
    }

    pub fn status(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            delay: None,
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self::status(302, Vec::new()).with_header("Location", location)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Handle to a running mock origin.
#[derive(Clone)]
pub struct Origin {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl Origin {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Start a programmable origin on an ephemeral port. Every connection
/// serves one request and closes.
pub async fn start_origin<F>(handler: F) -> Origin
where
    F: Fn(&RecordedRequest) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let handler = handler.clone();
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                recorded.lock().unwrap().push(request.clone());

                let reply = handler(&request);
                if let Some(delay) = reply.delay {
                    tokio::time::sleep(delay).await;
                }

                let reason = StatusCode::from_u16(reply.status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown");
                let mut head = format!("HTTP/1.1 {} {}\r\n", reply.status, reason);
                for (name, value) in &reply.headers {
                    head.push_str(&format!("{}: {}\r\n", name, value));
                }
                head.push_str(&format!(
                    "Content-Length: {}\r\nConnection: close\r\n\r\n",
                    reply.body.len()
                ));

                let _ = socket.write_all(head.as_bytes()).await;
                if request.method != "HEAD" {
                    let _ = socket.write_all(&reply.body).await;
                }
                let _ = socket.shutdown().await;
            });
        }
    });

    Origin { addr, requests }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let text = String::from_utf8_lossy(&buf);
    let mut lines = text.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let headers = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    Some(RecordedRequest {
        method,
        path,
        headers,
    })
}

/// Configuration every relay in the tests starts from.
pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.proxy.auth_code = AUTH.to_string();
    config.security.deny_private_targets = false;
    config.fetch.timeout_ms = 2_000;
    config
}

/// Start a relay whose rewritten URLs point back at itself.
pub async fn start_relay(config: RelayConfig) -> (SocketAddr, Shutdown) {
    serve_relay(config, |config| HttpServer::new(config).unwrap()).await
}

/// Same as [`start_relay`] with a caller-supplied origin fetcher.
pub async fn start_relay_with(config: RelayConfig, fetcher: Arc<dyn Fetch>) -> (SocketAddr, Shutdown) {
    serve_relay(config, move |config| {
        HttpServer::with_components(config, fetcher, Arc::new(UnavailableFtp))
    })
    .await
}

async fn serve_relay<F>(mut config: RelayConfig, build: F) -> (SocketAddr, Shutdown)
where
    F: FnOnce(RelayConfig) -> HttpServer,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.proxy.public_base_url = Some(format!("http://{}", addr));

    let server = build(config);
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Proxy URL on `relay` for `target`.
pub fn proxy_url(relay: SocketAddr, target: &str, headers: Option<&HeaderBag>) -> String {
    let endpoint = ProxyEndpoint::new(&format!("http://{}", relay), "");
    codec::encode(&endpoint, target, AUTH, headers)
}

/// Fetch spy that counts calls and answers every request the same way.
pub struct CountingFetcher {
    calls: AtomicUsize,
    content_type: &'static str,
    body: &'static [u8],
}

impl CountingFetcher {
    pub fn new(content_type: &'static str, body: &'static [u8]) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            content_type,
            body,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetch for CountingFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<OriginResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        Ok(OriginResponse {
            status: StatusCode::OK,
            final_url: request.url,
            headers,
            body: OriginBody::Bytes(Bytes::from_static(self.body)),
        })
    }
}
