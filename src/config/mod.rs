//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)      CLI flags / positional backends
//!     → loader.rs             │
//!     → merged into BalancerConfig
//!     → validation.rs (semantic checks, backend URL parsing)
//!     → immutable for the lifetime of the process
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so a config file is optional
//! - The backend set is fixed at startup; there is no reload
//! - Validation reports every problem, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BalancerConfig, ClientConfig, HealthCheckConfig, ListenerConfig, ObservabilityConfig,
    TimeoutConfig,
};
pub use validation::{parse_backend_address, validate_config, ValidationError};
