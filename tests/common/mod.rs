//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use gateway::config::from_json_str;
use gateway::{HttpServer, Shutdown};

/// A request as the mock backend saw it on the wire.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ReceivedRequest {
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// What the mock backend answers.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
    pub chunked: bool,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            chunked: false,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Send the body with `Transfer-Encoding: chunked` instead of `Content-Length`.
    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }
}

/// Read one HTTP/1.1 request (head plus Content-Length body).
async fn read_request(socket: &mut TcpStream) -> Option<ReceivedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter(|l| !l.is_empty())
        .filter_map(|l| l.split_once(':'))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(ReceivedRequest {
        method,
        target,
        headers,
        body,
    })
}

async fn write_response(socket: &mut TcpStream, response: &MockResponse) {
    let reason = StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let mut out = format!("HTTP/1.1 {} {}\r\n", response.status, reason);
    for (name, value) in &response.headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    if response.chunked {
        out.push_str("Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n");
        if !response.body.is_empty() {
            out.push_str(&format!("{:x}\r\n{}\r\n", response.body.len(), response.body));
        }
        out.push_str("0\r\n\r\n");
    } else {
        out.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            response.body.len(),
            response.body
        ));
    }
    let _ = socket.write_all(out.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Start a programmable mock backend on an ephemeral port.
///
/// Every request it receives is also sent on the returned channel.
pub async fn start_programmable_backend<F, Fut>(
    f: F,
) -> (SocketAddr, mpsc::UnboundedReceiver<ReceivedRequest>)
where
    F: Fn(ReceivedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                let _ = tx.send(request.clone());
                let response = f(request).await;
                write_response(&mut socket, &response).await;
            });
        }
    });

    (addr, rx)
}

/// Start a backend that reads one request per connection, then hands the
/// socket to `f` to write the response by hand.
pub async fn start_raw_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                if read_request(&mut socket).await.is_some() {
                    f(socket).await;
                }
            });
        }
    });

    addr
}

/// Start a mock backend that always answers `status` with `body`.
pub async fn start_mock_backend(status: u16, body: &'static str) -> SocketAddr {
    let (addr, _rx) =
        start_programmable_backend(move |_| async move { MockResponse::new(status, body) }).await;
    addr
}

/// Start a mock backend that waits `delay` before answering 200.
pub async fn start_slow_backend(delay: Duration) -> SocketAddr {
    let (addr, _rx) = start_programmable_backend(move |_| async move {
        tokio::time::sleep(delay).await;
        MockResponse::new(200, "slow")
    })
    .await;
    addr
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// A running gateway; shuts down when dropped.
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Build a gateway from a JSON config and serve it on an ephemeral port.
pub async fn start_gateway(config_json: &str) -> TestGateway {
    let mut config = from_json_str(config_json).unwrap();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.shutdown_grace_secs = 1;
    let root = config.build_router().unwrap();

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, root);
    tokio::spawn(server.run(listener, shutdown.clone()));

    // Subscription happens on first poll of the server future.
    tokio::task::yield_now().await;

    TestGateway { addr, shutdown }
}

/// A reqwest client that neither follows redirects nor pools connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}
