//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration and parse backend addresses
//! - Probe every backend once and build the pool
//! - Start the health monitor and the HTTP server
//! - Tear everything down in order on shutdown
//!
//! # Design Decisions
//! - Fail fast: configuration and bind errors are fatal
//! - Backends are probed before the listener starts serving traffic

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

use crate::config::{validate_config, BalancerConfig, ConfigError};
use crate::health::monitor::HealthMonitor;
use crate::health::probe::HttpProber;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::load_balancer::pool::ServerPool;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// A started balancer: pool, monitor task and server task.
pub struct Running {
    pool: Arc<ServerPool>,
    local_addr: SocketAddr,
    server: JoinHandle<Result<(), std::io::Error>>,
    monitor: JoinHandle<()>,
    shutdown: Shutdown,
}

impl Running {
    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the server to stop, close the pool, then wait for the monitor.
    pub async fn wait(self) -> Result<(), StartupError> {
        let served = match self.server.await {
            Ok(result) => result.map_err(StartupError::Serve),
            Err(e) => Err(StartupError::Serve(std::io::Error::other(e))),
        };

        // The server may also stop on its own; make sure the monitor follows.
        self.shutdown.trigger();
        self.pool.close();
        if let Err(e) = self.monitor.await {
            tracing::error!(error = %e, "Health monitor task failed");
        }
        served
    }
}

/// Build the pool and start serving on an already bound listener.
///
/// Both tasks stop when `shutdown` is triggered.
pub async fn launch(
    config: &BalancerConfig,
    listener: TcpListener,
    shutdown: &Shutdown,
) -> Result<Running, StartupError> {
    let addresses = validate_config(config).map_err(ConfigError::from)?;
    start(config, addresses, listener, shutdown).await
}

async fn start(
    config: &BalancerConfig,
    addresses: Vec<Url>,
    listener: TcpListener,
    shutdown: &Shutdown,
) -> Result<Running, StartupError> {
    let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
        address: config.listener.bind_address.clone(),
        source,
    })?;

    let prober = Arc::new(HttpProber::new(&config.health_check, &config.client));
    let pool = Arc::new(ServerPool::initialize(addresses, &*prober).await);
    let snapshot = pool.snapshot();
    tracing::info!(
        healthy = snapshot.healthy.len(),
        unhealthy = snapshot.unhealthy.len(),
        "Server pool ready"
    );

    let monitor = HealthMonitor::new(
        pool.clone(),
        prober,
        Duration::from_secs(config.health_check.interval_secs),
    )
    .spawn(shutdown.subscribe());

    let server = HttpServer::new(pool.clone(), config);
    let server = tokio::spawn(server.run(listener, shutdown.subscribe()));

    Ok(Running {
        pool,
        local_addr,
        server,
        monitor,
        shutdown: shutdown.clone(),
    })
}

/// Run the balancer until SIGINT/SIGTERM.
///
/// Configuration is validated before the listener is bound.
pub async fn run(config: BalancerConfig) -> Result<(), StartupError> {
    let addresses = validate_config(&config).map_err(ConfigError::from)?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    let running = start(&config, addresses, listener, &shutdown).await?;
    tracing::info!(address = %running.local_addr(), "Load balancer listening");

    tokio::spawn(async move {
        signals::terminate().await;
        shutdown.trigger();
    });

    running.wait().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
