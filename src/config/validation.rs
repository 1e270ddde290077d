//! Configuration validation.
//!
//! # Responsibilities
//! - Parse backend addresses into URLs
//! - Validate value ranges (durations > 0, addresses parse)
//! - Reject duplicate backends
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: &BalancerConfig → Result<Vec<Url>, Vec<ValidationError>>

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::BalancerConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error("backend {address:?} is not a valid URL: {reason}")]
    InvalidBackend { address: String, reason: String },

    #[error("backend {address:?} uses unsupported scheme {scheme:?} (only http)")]
    UnsupportedScheme { address: String, scheme: String },

    #[error("backend {0} is configured more than once")]
    DuplicateBackend(String),

    #[error("{field} {value:?} is not a valid socket address")]
    InvalidSocketAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("health_check.path {path:?} does not resolve against backend {backend}")]
    InvalidHealthPath { path: String, backend: String },
}

/// Resolve a probe path against a backend, staying on the backend's host and port.
pub fn join_health_path(backend: &Url, path: &str) -> Option<Url> {
    let target = backend.join(path).ok()?;
    let same_origin = target.scheme() == backend.scheme()
        && target.host_str().is_some_and(|h| Some(h) == backend.host_str())
        && target.port_or_known_default() == backend.port_or_known_default();
    same_origin.then_some(target)
}

/// Parse one backend address. A missing scheme defaults to `http://`.
pub fn parse_backend_address(raw: &str) -> Result<Url, ValidationError> {
    let raw = raw.trim();
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };

    let url = Url::parse(&candidate).map_err(|e| ValidationError::InvalidBackend {
        address: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" {
        return Err(ValidationError::UnsupportedScheme {
            address: raw.to_string(),
            scheme: url.scheme().to_string(),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ValidationError::InvalidBackend {
            address: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// Check the whole config and return the parsed backend list.
pub fn validate_config(config: &BalancerConfig) -> Result<Vec<Url>, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    let mut backends = Vec::with_capacity(config.backends.len());
    for raw in &config.backends {
        match parse_backend_address(raw) {
            Ok(url) => {
                if seen.insert(url.clone()) {
                    backends.push(url);
                } else {
                    errors.push(ValidationError::DuplicateBackend(url.to_string()));
                }
            }
            Err(e) => errors.push(e),
        }
    }

    if let Some(path) = &config.health_check.path {
        for backend in &backends {
            if join_health_path(backend, path).is_none() {
                errors.push(ValidationError::InvalidHealthPath {
                    path: path.clone(),
                    backend: backend.to_string(),
                });
            }
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidSocketAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidSocketAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    for (field, value) in [
        ("health_check.interval_secs", config.health_check.interval_secs),
        ("health_check.timeout_secs", config.health_check.timeout_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration(field));
        }
    }

    if errors.is_empty() {
        Ok(backends)
    } else {
        Err(errors)
    }
}
