//! Server pool.
//!
//! # Responsibilities
//! - Partition backends into healthy and unhealthy sets
//! - Own the round-robin cursor
//! - Move backends between the sets as probes complete
//!
//! # Design Decisions
//! - One mutex guards both sets and the cursor
//! - The lock is never held across a probe
//! - Moves are checked against current membership, so concurrent scans
//!   cannot duplicate or lose a backend

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::join_all;
use url::Url;

use crate::health::probe::Prober;
use crate::load_balancer::backend::{Backend, Health};
use crate::observability::metrics;

#[derive(Debug, Default)]
struct PoolState {
    healthy: Vec<Arc<Backend>>,
    unhealthy: Vec<Arc<Backend>>,
    cursor: usize,
    closed: bool,
}

/// Point-in-time copy of the pool membership.
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub healthy: Vec<Arc<Backend>>,
    pub unhealthy: Vec<Arc<Backend>>,
    pub cursor: usize,
}

impl PoolSnapshot {
    pub fn healthy_addresses(&self) -> Vec<String> {
        self.healthy.iter().map(|b| b.address().to_string()).collect()
    }

    pub fn unhealthy_addresses(&self) -> Vec<String> {
        self.unhealthy.iter().map(|b| b.address().to_string()).collect()
    }
}

/// Healthy/unhealthy partitions plus the round-robin cursor.
#[derive(Debug, Default)]
pub struct ServerPool {
    state: Mutex<PoolState>,
}

impl ServerPool {
    /// Build a pool from backends whose health was already recorded.
    pub fn new(backends: Vec<Arc<Backend>>) -> Self {
        let (healthy, unhealthy) = backends
            .into_iter()
            .partition(|b| b.health() == Health::Healthy);

        let pool = Self {
            state: Mutex::new(PoolState {
                healthy,
                unhealthy,
                ..PoolState::default()
            }),
        };
        pool.publish(&pool.lock());
        pool
    }

    /// Create a backend per address, probe each once and partition them.
    ///
    /// Healthy backends keep the order of `addresses`.
    pub async fn initialize<P, I>(addresses: I, prober: &P) -> Self
    where
        P: Prober,
        I: IntoIterator<Item = Url>,
    {
        let backends: Vec<Arc<Backend>> = addresses
            .into_iter()
            .map(|address| Arc::new(Backend::new(address)))
            .collect();

        let results = join_all(backends.iter().map(|b| b.probe(prober))).await;
        for (backend, health) in backends.iter().zip(results) {
            backend.record(health);
            tracing::info!(backend = %backend, health = %health, "Backend registered");
        }

        Self::new(backends)
    }

    /// Next healthy backend in rotation, or `None` when every backend is down.
    pub fn select_next(&self) -> Option<Arc<Backend>> {
        let mut state = self.lock();
        if state.healthy.is_empty() {
            return None;
        }

        if state.cursor >= state.healthy.len() {
            state.cursor = 0;
        }
        let backend = state.healthy[state.cursor].clone();
        state.cursor += 1;
        Some(backend)
    }

    /// Probe every healthy backend and demote the ones that fail.
    ///
    /// Survivors keep their relative order. Returns the number demoted.
    pub async fn reclassify_down<P: Prober>(&self, prober: &P) -> usize {
        let candidates = self.lock().healthy.clone();
        if candidates.is_empty() {
            return 0;
        }

        let results = join_all(candidates.iter().map(|b| b.probe(prober))).await;
        let failed: Vec<Arc<Backend>> = candidates
            .into_iter()
            .zip(results)
            .filter(|(_, health)| *health == Health::Down)
            .map(|(backend, _)| backend)
            .collect();

        if failed.is_empty() {
            return 0;
        }

        let mut state = self.lock();
        if state.closed {
            tracing::debug!(count = failed.len(), "Pool closed, discarding down-scan results");
            return 0;
        }

        let mut moved = 0;
        for backend in failed {
            let Some(pos) = state.healthy.iter().position(|b| Arc::ptr_eq(b, &backend)) else {
                continue;
            };
            state.healthy.remove(pos);
            backend.record(Health::Down);
            tracing::warn!(backend = %backend, "Backend marked down");
            state.unhealthy.push(backend);
            moved += 1;
        }

        self.publish(&state);
        moved
    }

    /// Probe every unhealthy backend and promote the ones that recovered.
    ///
    /// Recovered backends join the tail of the rotation. Returns the number
    /// promoted.
    pub async fn reclassify_up<P: Prober>(&self, prober: &P) -> usize {
        let candidates = self.lock().unhealthy.clone();
        if candidates.is_empty() {
            return 0;
        }

        let results = join_all(candidates.iter().map(|b| b.probe(prober))).await;
        let recovered: Vec<Arc<Backend>> = candidates
            .into_iter()
            .zip(results)
            .filter(|(_, health)| *health == Health::Healthy)
            .map(|(backend, _)| backend)
            .collect();

        if recovered.is_empty() {
            return 0;
        }

        let mut state = self.lock();
        if state.closed {
            tracing::debug!(count = recovered.len(), "Pool closed, discarding up-scan results");
            return 0;
        }

        let mut moved = 0;
        for backend in recovered {
            let Some(pos) = state.unhealthy.iter().position(|b| Arc::ptr_eq(b, &backend)) else {
                continue;
            };
            state.unhealthy.remove(pos);
            backend.record(Health::Healthy);
            tracing::info!(backend = %backend, "Backend back in rotation");
            state.healthy.push(backend);
            moved += 1;
        }

        self.publish(&state);
        moved
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.lock();
        PoolSnapshot {
            healthy: state.healthy.clone(),
            unhealthy: state.unhealthy.clone(),
            cursor: state.cursor,
        }
    }

    /// Number of configured backends.
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.healthy.len() + state.unhealthy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark the pool as torn down. Scans finishing afterwards change nothing.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // Every critical section leaves the state consistent, so a poisoned
        // lock still holds valid data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &PoolState) {
        metrics::record_pool_size(state.healthy.len(), state.unhealthy.len());
        for backend in state.healthy.iter().chain(&state.unhealthy) {
            metrics::record_backend_health(backend.address().as_str(), backend.health() == Health::Healthy);
        }
    }
}
