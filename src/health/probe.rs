//! Active health probes.
//!
//! # Responsibilities
//! - Issue a bounded GET against a backend
//! - Classify the outcome as [`Health::Healthy`] or [`Health::Down`]
//!
//! # Design Decisions
//! - Only `200 OK` counts as healthy
//! - Timeouts, connection errors and other statuses all collapse to `Down`
//! - Probes share one keep-alive client

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::time;
use url::Url;

use crate::config::validation::join_health_path;
use crate::config::{ClientConfig, HealthCheckConfig};
use crate::load_balancer::backend::Health;

const USER_AGENT: &str = concat!("rr-balancer-health-check/", env!("CARGO_PKG_VERSION"));

/// Something that can tell whether a backend currently serves traffic.
pub trait Prober: Send + Sync {
    fn probe(&self, address: &Url) -> impl Future<Output = Health> + Send;
}

/// Reasons a probe did not succeed.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("connection error: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("non-success status {0}")]
    Status(StatusCode),
}

/// HTTP prober backed by a pooled hyper-util client.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
    path: Option<String>,
}

impl HttpProber {
    pub fn new(health: &HealthCheckConfig, client: &ClientConfig) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(client.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(client.pool_idle_timeout_secs))
            .build(HttpConnector::new());

        Self {
            client,
            timeout: Duration::from_secs(health.timeout_secs),
            path: health.path.clone(),
        }
    }

    /// Where the probe for `address` is sent.
    /// A path that does not resolve is rejected by `validate_config`.
    pub fn target(&self, address: &Url) -> Url {
        self.path
            .as_deref()
            .and_then(|path| join_health_path(address, path))
            .unwrap_or_else(|| address.clone())
    }

    async fn check(&self, address: &Url) -> Result<(), ProbeError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.target(address).as_str())
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())?;

        let response = time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| ProbeError::Timeout(self.timeout))??;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(ProbeError::Status(status)),
        }
    }
}

impl Prober for HttpProber {
    async fn probe(&self, address: &Url) -> Health {
        match self.check(address).await {
            Ok(()) => Health::Healthy,
            Err(e) => {
                tracing::debug!(backend = %address, error = %e, "Health probe failed");
                Health::Down
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn prober(path: Option<&str>) -> HttpProber {
        let health = HealthCheckConfig {
            timeout_secs: 1,
            path: path.map(str::to_string),
            ..HealthCheckConfig::default()
        };
        HttpProber::new(&health, &ClientConfig::default())
    }

    fn url(addr: SocketAddr) -> Url {
        format!("http://{}", addr).parse().unwrap()
    }

    #[test]
    fn test_target_joins_path() {
        let address: Url = "http://10.0.0.1:8080".parse().unwrap();
        assert_eq!(prober(None).target(&address).as_str(), "http://10.0.0.1:8080/");
        assert_eq!(
            prober(Some("/health")).target(&address).as_str(),
            "http://10.0.0.1:8080/health"
        );
    }

    #[tokio::test]
    async fn test_ok_is_healthy() {
        let addr = serve(Router::new().route("/", get(|| async { "ok" }))).await;
        assert_eq!(prober(None).probe(&url(addr)).await, Health::Healthy);
    }

    #[tokio::test]
    async fn test_non_200_is_down() {
        let app = Router::new()
            .route("/", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
            .route("/created", get(|| async { StatusCode::CREATED }));
        let addr = serve(app).await;

        assert_eq!(prober(None).probe(&url(addr)).await, Health::Down);
        assert_eq!(prober(Some("/created")).probe(&url(addr)).await, Health::Down);
    }

    #[tokio::test]
    async fn test_refused_connection_is_down() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = prober(None).check(&url(addr)).await;
        assert!(matches!(result, Err(ProbeError::Transport(_))));
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let app = Router::new().route(
            "/",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let addr = serve(app).await;

        let result = prober(None).check(&url(addr)).await;
        assert!(matches!(result, Err(ProbeError::Timeout(_))));
    }
}
