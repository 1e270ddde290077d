//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all route
//! - Wire up middleware (tracing, request ID)
//! - Pick the next healthy backend for every request
//! - Forward the request and stream the backend response back
//!
//! # Design Decisions
//! - One attempt per request: a failed backend call is reported, not retried
//! - The backend call is bounded by `timeouts.request_secs`; expiry is a 504
//! - Request and response bodies are streamed, never buffered
//! - The client is shared, so connections to backends are reused

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, Version},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{BalancerConfig, ClientConfig};
use crate::http::request::{
    propagate_request_id_layer, rewrite_target, set_request_id_layer, X_REQUEST_ID,
};
use crate::http::response::DispatchError;
use crate::load_balancer::pool::ServerPool;
use crate::observability::metrics;

/// Outbound client used for forwarded requests.
pub type ProxyClient = Client<HttpConnector, Body>;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<ServerPool>,
    pub client: ProxyClient,
    /// Upper bound on waiting for a backend's response head.
    pub request_timeout: Duration,
}

/// HTTP front end of the balancer.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(pool: Arc<ServerPool>, config: &BalancerConfig) -> Self {
        let state = AppState {
            pool,
            client: build_client(&config.client),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(propagate_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(X_REQUEST_ID)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("unknown");
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id,
                        )
                    })),
            )
    }

    /// The fully layered router, for serving or driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until the shutdown broadcast fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

pub fn build_client(config: &ClientConfig) -> ProxyClient {
    Client::builder(TokioExecutor::new())
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
        .build(HttpConnector::new())
}

/// Catch-all proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match dispatch(&state, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Forward one request to the next healthy backend.
pub async fn dispatch(state: &AppState, request: Request<Body>) -> Result<Response, DispatchError> {
    let start_time = Instant::now();
    let method = request.method().clone();

    let Some(backend) = state.pool.select_next() else {
        tracing::warn!(method = %method, path = %request.uri().path(), "No healthy backends");
        metrics::record_request(method.as_str(), 503, "none", start_time);
        return Err(DispatchError::NoBackendAvailable);
    };

    let (mut parts, body) = request.into_parts();
    parts.uri = rewrite_target(&parts.uri, backend.address())?;
    parts.version = Version::HTTP_11;
    if let Some(authority) = parts.uri.authority() {
        if let Ok(host) = HeaderValue::from_str(authority.as_str()) {
            parts.headers.insert(header::HOST, host);
        }
    }

    let result = match time::timeout(
        state.request_timeout,
        state.client.request(Request::from_parts(parts, body)),
    )
    .await
    {
        Ok(result) => result.map_err(DispatchError::from),
        Err(_) => Err(DispatchError::Timeout(state.request_timeout)),
    };
    tracing::info!(
        server_url = %backend,
        duration = ?start_time.elapsed(),
        "Forwarded request"
    );

    match result {
        Ok(response) => {
            metrics::record_request(
                method.as_str(),
                response.status().as_u16(),
                backend.address().as_str(),
                start_time,
            );
            let (parts, body) = response.into_parts();
            Ok(Response::from_parts(parts, Body::new(body)))
        }
        Err(err) => {
            tracing::error!(server_url = %backend, error = %err, "Backend call failed");
            metrics::record_request(
                method.as_str(),
                err.status().as_u16(),
                backend.address().as_str(),
                start_time,
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::NO_HEALTHY_SERVERS;
    use crate::load_balancer::backend::{Backend, Health};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn server(pool: ServerPool) -> HttpServer {
        HttpServer::new(Arc::new(pool), &BalancerConfig::default())
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_empty_pool_returns_503() {
        let response = server(ServerPool::default())
            .router()
            .oneshot(Request::get("/anything").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(X_REQUEST_ID));
        assert_eq!(body_text(response).await, NO_HEALTHY_SERVERS);
    }

    #[tokio::test]
    async fn test_unreachable_backend_returns_502() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = Backend::new(format!("http://{}", addr).parse().unwrap());
        backend.record(Health::Healthy);
        let pool = ServerPool::new(vec![Arc::new(backend)]);

        let response = server(pool)
            .router()
            .oneshot(Request::post("/submit").body(Body::from("payload")).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_text(response).await.starts_with("Something went wrong: "));
    }

    #[tokio::test]
    async fn test_slow_backend_returns_504() {
        // Accepts connections and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stalled = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let backend = Backend::new(format!("http://{}", addr).parse().unwrap());
        backend.record(Health::Healthy);
        let mut config = BalancerConfig::default();
        config.timeouts.request_secs = 1;
        let server = HttpServer::new(Arc::new(ServerPool::new(vec![Arc::new(backend)])), &config);

        let started = Instant::now();
        let response = server
            .router()
            .oneshot(Request::get("/slow").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(response.headers().contains_key(X_REQUEST_ID));
        assert!(body_text(response).await.starts_with("Something went wrong: "));
        stalled.abort();
    }

    #[tokio::test]
    async fn test_request_id_is_kept() {
        let response = server(ServerPool::default())
            .router()
            .oneshot(
                Request::get("/")
                    .header(X_REQUEST_ID, "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[X_REQUEST_ID], "abc-123");
    }
}
