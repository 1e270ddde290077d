//! Round-robin HTTP load balancer.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌───────────────────────────────────────────────┐
//!                        │                 LOAD BALANCER                  │
//!                        │                                                │
//!   Client Request       │  ┌─────────┐    ┌────────────┐    ┌─────────┐ │
//!   ─────────────────────┼─▶│  http   │───▶│ server     │───▶│ backend │─┼──▶ Backend
//!                        │  │ server  │    │ pool       │    │ client  │ │    Server
//!   Client Response      │  │         │◀───│ select_next│    │         │ │
//!   ◀────────────────────┼──│         │◀───┼────────────┼────│         │◀┼───
//!                        │  └─────────┘    └─────▲──────┘    └─────────┘ │
//!                        │                       │ reclassify            │
//!                        │                 ┌─────┴──────┐                │
//!                        │                 │   health   │── probes ──────┼──▶ Backends
//!                        │                 │  monitor   │                │
//!                        │                 └────────────┘                │
//!                        └───────────────────────────────────────────────┘
//! ```

use clap::Parser;

use rr_balancer::cli::Cli;
use rr_balancer::config::ConfigError;
use rr_balancer::lifecycle::startup::{self, StartupError};
use rr_balancer::observability::{logging, metrics};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("rr-balancer: {}", e);
            std::process::exit(2);
        }
    };

    logging::init(&config.observability);
    tracing::info!("rr-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        health_check_interval_secs = config.health_check.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    match startup::run(config).await {
        Ok(()) => {}
        Err(StartupError::Config(ConfigError::Validation(errors))) => {
            for e in &errors {
                tracing::error!(error = %e, "Invalid configuration");
            }
            std::process::exit(2);
        }
        Err(e) => {
            tracing::error!(error = %e, "Load balancer stopped");
            std::process::exit(1);
        }
    }
}
