//! Round-robin HTTP load balancer.
//!
//! Requests are spread over a static set of backends; a periodic health
//! monitor takes failing backends out of rotation and brings recovered ones
//! back.

pub mod cli;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;

pub use config::BalancerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::ServerPool;
