//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! pool, monitor, dispatcher produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through the proxy's trace spans
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
