//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request accepted → client key (remote ip:port)
//!     → pool.rs (snapshot of healthy backends)
//!     → hash.rs (digest of key mod pool size)
//!     → backend.rs (chosen address)
//!     → Return backend or "no backend available"
//! ```
//!
//! # Design Decisions
//! - Selection is a pure function of key, seed and snapshot
//! - The pool is the only shared mutable state; health tasks write, requests read
//! - Unhealthy backends are not flagged, they are absent from the pool

use std::fmt::Debug;

pub mod backend;
pub mod hash;
pub mod pool;

pub use backend::{AddrError, BackendAddr, Scheme};
pub use hash::ClientHash;
pub use pool::ServerPool;

/// Strategy for choosing a backend out of a pool snapshot.
pub trait LoadBalancer: Send + Sync + Debug {
    /// Pick one member of `servers` for `key`, or `None` when `servers` is empty.
    fn select(&self, key: &str, servers: &[BackendAddr]) -> Option<BackendAddr>;
}
