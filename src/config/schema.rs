//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

/// Root configuration for the balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Backend addresses in rotation order (e.g. "http://127.0.0.1:3000").
    pub backends: Vec<String>,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Outbound client settings, shared by probes and forwarded requests.
    pub client: ClientConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:80").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:80".to_string(),
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Seconds between probe rounds.
    pub interval_secs: u64,

    /// Seconds a single probe may take before the backend counts as down.
    pub timeout_secs: u64,

    /// Path joined onto the backend address for probes.
    /// When unset the backend address itself is probed.
    pub path: Option<String>,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            timeout_secs: 2,
            path: None,
        }
    }
}

/// Connection pool settings for the outbound client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Maximum idle keep-alive connections kept per backend.
    pub pool_max_idle_per_host: usize,

    /// Seconds an idle connection is kept before being closed.
    pub pool_idle_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 1024,
            pool_idle_timeout_secs: 90,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Seconds to wait for a backend's response head before answering 504.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
