//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    Router,
};
use rr_balancer::config::BalancerConfig;
use rr_balancer::lifecycle::startup::{self, Running};
use rr_balancer::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct Shared {
    name: &'static str,
    healthy: AtomicBool,
    hits: AtomicUsize,
}

/// A mock backend that answers `<name> <method> <path?query> <body>`.
///
/// While unhealthy it answers 500 to everything. `/status/<code>` answers
/// with that status. Health probes are not counted as hits.
pub struct MockBackend {
    pub addr: SocketAddr,
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl MockBackend {
    pub fn set_healthy(&self, healthy: bool) {
        self.shared.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.shared.hits.load(Ordering::SeqCst)
    }

    /// As printed in pool snapshots.
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Stop accepting connections.
    pub async fn stop(&self) {
        self.task.abort();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn answer(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, [(&'static str, &'static str); 1], String) {
    let tag = [("x-backend", shared.name)];
    if !shared.healthy.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, tag, "dead".into());
    }

    let is_probe = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ua| ua.starts_with("rr-balancer-health-check"));
    if !is_probe {
        shared.hits.fetch_add(1, Ordering::SeqCst);
    }

    let status = uri
        .path()
        .strip_prefix("/status/")
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    let body = format!("{} {} {} {}", shared.name, method, path, String::from_utf8_lossy(&body));
    (status, tag, body.trim_end().to_string())
}

pub async fn start_backend(name: &'static str, healthy: bool) -> MockBackend {
    let shared = Arc::new(Shared {
        name,
        healthy: AtomicBool::new(healthy),
        hits: AtomicUsize::new(0),
    });
    let app = Router::new().fallback(answer).with_state(shared.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend { addr, shared, task }
}

/// An address nothing listens on.
pub fn closed_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

pub fn config(backends: &[SocketAddr], interval_secs: u64) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.backends = backends.iter().map(|a| a.to_string()).collect();
    config.health_check.interval_secs = interval_secs;
    config.health_check.timeout_secs = 1;
    config
}

pub async fn start_balancer(config: &BalancerConfig, shutdown: &Shutdown) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    startup::launch(config, listener, shutdown).await.unwrap()
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Poll `cond` every 50ms until it holds or `limit` elapses.
pub async fn wait_until(limit: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    cond()
}
