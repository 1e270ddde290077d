//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! monitor.rs: periodic timer
//!     → down-scan: probe healthy backends  ─┐ concurrently
//!     → up-scan:   probe unhealthy backends ─┘
//!     → pool moves backends between partitions
//!
//! probe.rs: one bounded GET per backend
//!     200 OK → Healthy, anything else → Down
//! ```
//!
//! # Design Decisions
//! - A probe failure is a classification, never an error for the caller
//! - No hysteresis: one failed probe demotes, one success promotes

pub mod monitor;
pub mod probe;

pub use monitor::HealthMonitor;
pub use probe::{HttpProber, ProbeError, Prober};
