//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Probe backends → Spawn health monitor → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain requests
//!         → Close pool → Drain in-flight probes → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
