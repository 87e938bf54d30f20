//! Server pool management.
//!
//! # Responsibilities
//! - Hold the ordered list of backends currently believed healthy
//! - Serialize membership changes against snapshots
//!
//! The lock is only ever held for a `Vec` operation. Probing and forwarding
//! happen on snapshots, outside the critical section.

use std::sync::{Mutex, MutexGuard};

use crate::load_balancer::backend::BackendAddr;

/// The live set of healthy backends.
#[derive(Debug, Default)]
pub struct ServerPool {
    servers: Mutex<Vec<BackendAddr>>,
}

impl ServerPool {
    /// Create a pool holding `servers` in order, skipping duplicates.
    pub fn new(servers: impl IntoIterator<Item = BackendAddr>) -> Self {
        let mut unique: Vec<BackendAddr> = Vec::new();
        for server in servers {
            if !unique.contains(&server) {
                unique.push(server);
            }
        }
        Self {
            servers: Mutex::new(unique),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<BackendAddr>> {
        // A panic while holding the guard cannot leave the Vec half-updated,
        // so a poisoned lock still guards a valid pool.
        self.servers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copy of the pool at a single point in time.
    pub fn snapshot(&self) -> Vec<BackendAddr> {
        self.lock().clone()
    }

    /// Remove `addr` if present. Returns true when the pool changed.
    pub fn remove(&self, addr: &BackendAddr) -> bool {
        let mut servers = self.lock();
        match servers.iter().position(|s| s == addr) {
            Some(index) => {
                // `Vec::remove` shifts, keeping the relative order of the rest.
                servers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Append `addr` unless it is already a member. Returns true when the pool changed.
    pub fn add(&self, addr: &BackendAddr) -> bool {
        let mut servers = self.lock();
        if servers.contains(addr) {
            return false;
        }
        servers.push(addr.clone());
        true
    }

    pub fn contains(&self, addr: &BackendAddr) -> bool {
        self.lock().contains(addr)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn addr(s: &str) -> BackendAddr {
        BackendAddr::parse(s).unwrap()
    }

    fn pool_of(names: &[&str]) -> ServerPool {
        ServerPool::new(names.iter().map(|n| addr(n)))
    }

    #[test]
    fn test_new_skips_duplicates() {
        let pool = pool_of(&["s1:80", "s2:80", "s1:80"]);
        assert_eq!(pool.snapshot(), vec![addr("s1:80"), addr("s2:80")]);
    }

    #[test]
    fn test_remove_keeps_order() {
        let pool = pool_of(&["s1:80", "s2:80", "s3:80"]);

        assert!(pool.remove(&addr("s2:80")));
        assert_eq!(pool.snapshot(), vec![addr("s1:80"), addr("s3:80")]);

        // Absent address is a no-op
        assert!(!pool.remove(&addr("s2:80")));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_add_is_idempotent() {
        let pool = pool_of(&["s1:80", "s3:80"]);

        assert!(pool.add(&addr("s2:80")));
        assert!(!pool.add(&addr("s2:80")));
        assert_eq!(
            pool.snapshot(),
            vec![addr("s1:80"), addr("s3:80"), addr("s2:80")]
        );
    }

    #[test]
    fn test_empty_pool() {
        let pool = ServerPool::default();
        assert!(pool.is_empty());
        assert!(pool.snapshot().is_empty());
        assert!(!pool.remove(&addr("s1:80")));
        assert!(!pool.contains(&addr("s1:80")));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let pool = pool_of(&["s1:80", "s2:80"]);
        let before = pool.snapshot();
        pool.remove(&addr("s1:80"));

        assert_eq!(before.len(), 2);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_concurrent_mutation_stays_duplicate_free() {
        let names: Vec<BackendAddr> = (0..8).map(|i| addr(&format!("s{}:80", i))).collect();
        let pool = Arc::new(ServerPool::new(names.clone()));

        let mut handles = Vec::new();
        for t in 0..16 {
            let pool = pool.clone();
            let names = names.clone();
            handles.push(thread::spawn(move || {
                for i in 0..1_000 {
                    let target = &names[(t + i) % names.len()];
                    match i % 3 {
                        0 => {
                            pool.remove(target);
                        }
                        1 => {
                            pool.add(target);
                        }
                        _ => {
                            let snapshot = pool.snapshot();
                            let unique: HashSet<_> = snapshot.iter().collect();
                            assert_eq!(unique.len(), snapshot.len());
                        }
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = pool.snapshot();
        let unique: HashSet<_> = snapshot.iter().collect();
        assert_eq!(unique.len(), snapshot.len());
        assert!(snapshot.iter().all(|s| names.contains(s)));
    }
}
