//! Periodic health monitor.
//!
//! # Responsibilities
//! - Fire a probe round every interval
//! - Run the down-scan and up-scan of each round concurrently
//! - Stop on shutdown and let in-flight rounds finish

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::health::probe::Prober;
use crate::load_balancer::pool::ServerPool;

pub struct HealthMonitor<P> {
    pool: Arc<ServerPool>,
    prober: Arc<P>,
    interval: Duration,
}

impl<P: Prober + 'static> HealthMonitor<P> {
    pub fn new(pool: Arc<ServerPool>, prober: Arc<P>, interval: Duration) -> Self {
        Self {
            pool,
            prober,
            interval,
        }
    }

    /// Run the monitor on its own task.
    ///
    /// The handle resolves once shutdown was observed and every in-flight
    /// probe round has completed.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Health monitor starting");

        // The pool was probed when it was built; the first round waits a
        // full interval.
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut rounds = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.start_round(&mut rounds);
                }
                Some(finished) = rounds.join_next(), if !rounds.is_empty() => {
                    if let Err(e) = finished {
                        tracing::error!(error = %e, "Health check task failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        let in_flight = rounds.len();
        if in_flight > 0 {
            tracing::debug!(in_flight, "Waiting for in-flight health checks");
        }
        while let Some(finished) = rounds.join_next().await {
            if let Err(e) = finished {
                tracing::error!(error = %e, "Health check task failed");
            }
        }
        tracing::info!("Health monitor stopped");
    }

    fn start_round(&self, rounds: &mut JoinSet<()>) {
        let (pool, prober) = (self.pool.clone(), self.prober.clone());
        rounds.spawn(async move {
            let demoted = pool.reclassify_down(&*prober).await;
            if demoted > 0 {
                tracing::debug!(demoted, "Down-scan finished");
            }
        });

        let (pool, prober) = (self.pool.clone(), self.prober.clone());
        rounds.spawn(async move {
            let promoted = pool.reclassify_up(&*prober).await;
            if promoted > 0 {
                tracing::debug!(promoted, "Up-scan finished");
            }
        });
    }
}
