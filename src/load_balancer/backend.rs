//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server
//! - Remember the last recorded health state
//! - Expose the active probe operation

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use url::Url;

use crate::health::probe::Prober;

/// Health of a backend as observed by its last completed probe.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy = 1,
    Down = 2,
}

impl From<u8> for Health {
    fn from(val: u8) -> Self {
        match val {
            1 => Health::Healthy,
            _ => Health::Down,
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Health::Healthy => f.write_str("healthy"),
            Health::Down => f.write_str("down"),
        }
    }
}

/// A single upstream server.
#[derive(Debug)]
pub struct Backend {
    /// Base URL requests and probes are sent to.
    address: Url,
    /// Last recorded health (see [`Health`]).
    health: AtomicU8,
}

impl Backend {
    /// Create a backend that has not passed a probe yet.
    pub fn new(address: Url) -> Self {
        Self {
            address,
            health: AtomicU8::new(Health::Down as u8),
        }
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    /// Last health recorded by the pool.
    pub fn health(&self) -> Health {
        Health::from(self.health.load(Ordering::Relaxed))
    }

    /// Check the backend right now.
    ///
    /// The result is returned, not stored: the pool decides what to do with
    /// it and records it through [`Backend::record`].
    pub async fn probe<P: Prober>(&self, prober: &P) -> Health {
        prober.probe(&self.address).await
    }

    pub(crate) fn record(&self, health: Health) {
        self.health.store(health as u8, Ordering::Relaxed);
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.address.as_str())
    }
}
