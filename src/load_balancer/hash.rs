//! Client-hash load balancing strategy.
//!
//! The routing digest is SHA-512 over a per-process seed followed by the
//! selection key; its first eight bytes are reduced modulo the pool size.
//! The seed only keeps the mapping from being identical across restarts.
//!
//! There is no consistent-hash ring: when the pool size changes, every
//! client may be remapped.

use sha2::{Digest, Sha512};

use crate::load_balancer::{backend::BackendAddr, LoadBalancer};

/// Deterministic key-to-backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientHash {
    seed: u64,
}

impl ClientHash {
    /// Selector with a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Selector with a seed drawn once, at process start.
    pub fn random() -> Self {
        Self::new(rand::random())
    }

    /// Use the configured seed if there is one.
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map(Self::new).unwrap_or_else(Self::random)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// 64-bit routing digest of `key`.
    pub fn digest(&self, key: &str) -> u64 {
        let mut hasher = Sha512::new();
        hasher.update(self.seed.to_be_bytes());
        hasher.update(key.as_bytes());
        let out = hasher.finalize();

        let mut head = [0u8; 8];
        head.copy_from_slice(&out[..8]);
        u64::from_be_bytes(head)
    }

    /// Pool index for `key`, or `None` for an empty pool.
    pub fn index(&self, key: &str, pool_len: usize) -> Option<usize> {
        if pool_len == 0 {
            return None;
        }
        Some((self.digest(key) % pool_len as u64) as usize)
    }
}

impl Default for ClientHash {
    fn default() -> Self {
        Self::random()
    }
}

impl LoadBalancer for ClientHash {
    fn select(&self, key: &str, servers: &[BackendAddr]) -> Option<BackendAddr> {
        self.index(key, servers.len())
            .and_then(|index| servers.get(index))
            .cloned()
    }
}
