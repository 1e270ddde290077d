//! Dispatch failures and their responses.
//!
//! # Design Decisions
//! - An empty pool is a normal outcome: 503 with a fixed plain-text body
//! - A failed backend call is 502 with the error chain in the body
//! - A backend that does not answer in time is 504
//! - Nothing is retried against another backend

use std::error::Error as _;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Body returned when no backend is in rotation.
pub const NO_HEALTHY_SERVERS: &str = "NO healthy servers";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{}", NO_HEALTHY_SERVERS)]
    NoBackendAvailable,

    #[error("Something went wrong: {}", chain(.0))]
    Backend(#[from] hyper_util::client::legacy::Error),

    #[error("Something went wrong: backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error("invalid upstream target: {0}")]
    InvalidTarget(#[from] axum::http::uri::InvalidUri),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NoBackendAvailable => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::Backend(_) => StatusCode::BAD_GATEWAY,
            DispatchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            DispatchError::InvalidTarget(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// "outer: inner: root" for an error and its sources.
fn chain(err: &hyper_util::client::legacy::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_backend_response() {
        let response = DispatchError::NoBackendAvailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], NO_HEALTHY_SERVERS.as_bytes());
    }

    #[tokio::test]
    async fn test_timeout_response() {
        let response = DispatchError::Timeout(Duration::from_secs(30)).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"Something went wrong: backend did not respond within 30s");
    }

    #[test]
    fn test_invalid_target_status() {
        let err = "http://exa mple.com".parse::<axum::http::Uri>().unwrap_err();
        assert_eq!(
            DispatchError::from(err).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
