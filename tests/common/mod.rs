//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use capture_gateway::capture::Credentials;
use capture_gateway::config::GatewayConfig;
use capture_gateway::{CallStore, GatewayServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// What the mock backend answers with.
#[derive(Clone)]
pub struct MockReply {
    pub status_line: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: Vec<u8>,
    /// Wait before sending the status line.
    pub header_delay: Duration,
    /// Split the body into this many chunks, pausing before each.
    pub body_chunks: usize,
    pub chunk_delay: Duration,
    /// Close the connection after this many body bytes, short of `Content-Length`.
    pub truncate_after: Option<usize>,
}

impl MockReply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::with_status("200 OK", body)
    }

    pub fn with_status(status_line: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status_line,
            headers: vec![("Content-Type", "application/json".to_string())],
            body: body.into(),
            header_delay: Duration::ZERO,
            body_chunks: 1,
            chunk_delay: Duration::ZERO,
            truncate_after: None,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// A request as the backend saw it.
#[derive(Debug)]
pub struct SeenRequest {
    pub request_line: String,
    /// Lowercased names, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SeenRequest {
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// Start a backend on an ephemeral port that answers every request with `reply`.
pub async fn start_backend(reply: MockReply) -> (SocketAddr, mpsc::UnboundedReceiver<SeenRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let reply = reply.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(seen) = serve_one(socket, &reply).await {
                    let _ = tx.send(seen);
                }
            });
        }
    });

    (addr, rx)
}

async fn serve_one(mut socket: TcpStream, reply: &MockReply) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(n, v)| (n.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(n, _)| n == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    tokio::time::sleep(reply.header_delay).await;

    let mut head = format!("HTTP/1.1 {}\r\n", reply.status_line);
    for (name, value) in &reply.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        reply.body.len()
    ));
    socket.write_all(head.as_bytes()).await.ok()?;
    socket.flush().await.ok()?;

    let sent = match reply.truncate_after {
        Some(limit) => &reply.body[..limit.min(reply.body.len())],
        None => &reply.body[..],
    };
    let chunk_size = sent.len().div_ceil(reply.body_chunks.max(1)).max(1);
    for piece in sent.chunks(chunk_size) {
        tokio::time::sleep(reply.chunk_delay).await;
        socket.write_all(piece).await.ok()?;
        socket.flush().await.ok()?;
    }
    let _ = socket.shutdown().await;

    Some(SeenRequest {
        request_line,
        headers,
        body,
    })
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A running gateway and its store.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub store: CallStore,
    pub shutdown: Shutdown,
    _dir: tempfile::TempDir,
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

/// Base config pointing at `backend` with the dump disabled.
pub fn config_for(backend: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.backend.base_url = format!("http://{backend}/v1");
    config.backend.use_system_proxy = false;
    config.capture.response_dump_path = String::new();
    config
}

pub async fn start_gateway(config: GatewayConfig, credentials: Credentials) -> TestGateway {
    let dir = tempfile::tempdir().unwrap();
    let store = CallStore::open(dir.path().join("requests.db")).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config, store.clone(), credentials).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway {
        addr,
        store,
        shutdown,
        _dir: dir,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}
