//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → pool.rs select_next (round-robin over healthy backends)
//!     → backend.rs (address to forward to)
//!     → or None when every backend is down
//!
//! Health monitor tick
//!     → pool.rs reclassify_down / reclassify_up
//! ```
//!
//! # Design Decisions
//! - The pool owns all shared state behind one lock
//! - The cursor is wrapped at use, against the current healthy length
//! - Recovered backends join the tail of the rotation

pub mod backend;
pub mod pool;

pub use backend::{Backend, Health};
pub use pool::{PoolSnapshot, ServerPool};
