//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode},
    routing::get,
    Router,
};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use httpbuf::buffer::{BufferedRequest, Scheme};

/// A request as seen by the mock backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Clone)]
struct BackendState {
    health: Arc<AtomicU16>,
    reply: Arc<AtomicU16>,
    received: Arc<Mutex<Vec<Recorded>>>,
}

/// A programmable backend: `/status` answers with the health status, every
/// other request is recorded and answered with the reply status.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    state: BackendState,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = BackendState {
            health: Arc::new(AtomicU16::new(200)),
            reply: Arc::new(AtomicU16::new(200)),
            received: Arc::new(Mutex::new(Vec::new())),
        };

        let app = Router::new()
            .route("/status", get(health_handler))
            .fallback(record_handler)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn health_url(&self) -> String {
        format!("http://{}/status", self.addr)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_health(&self, status: u16) {
        self.state.health.store(status, Ordering::SeqCst);
    }

    pub fn set_reply(&self, status: u16) {
        self.state.reply.store(status, Ordering::SeqCst);
    }

    pub fn received(&self) -> Vec<Recorded> {
        self.state.received.lock().clone()
    }

    pub fn hits(&self) -> usize {
        self.state.received.lock().len()
    }
}

async fn health_handler(State(state): State<BackendState>) -> StatusCode {
    StatusCode::from_u16(state.health.load(Ordering::SeqCst)).unwrap()
}

async fn record_handler(State(state): State<BackendState>, request: Request<Body>) -> StatusCode {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    state.received.lock().push(Recorded {
        method: parts.method,
        path_and_query: parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default(),
        headers: parts.headers,
        body,
    });
    StatusCode::from_u16(state.reply.load(Ordering::SeqCst)).unwrap()
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A snapshot aimed at `host`.
pub fn snapshot(host: &str, path: &str, body: &'static str) -> BufferedRequest {
    let mut headers = HeaderMap::new();
    headers.insert("host", host.parse().unwrap());
    headers.insert("content-type", "text/plain".parse().unwrap());
    BufferedRequest::new(
        Method::POST,
        Some(host.to_string()),
        path,
        headers,
        Bytes::from_static(body.as_bytes()),
        Scheme::Http,
    )
}

/// Poll `cond` every 20ms until it holds or `timeout` passes.
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    cond()
}
