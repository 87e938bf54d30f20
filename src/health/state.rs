//! Probe outcomes and pool transitions.
//!
//! # States
//! - In pool: backend receives traffic
//! - Out of pool: backend excluded from selection, still probed
//!
//! # State Transitions
//! ```text
//! In pool → Out of pool: one failed probe
//! Out of pool → In pool: one successful probe
//! ```
//!
//! Each probe stands alone; there are no thresholds and no history.

use axum::http::StatusCode;
use thiserror::Error;

use crate::load_balancer::{BackendAddr, ServerPool};

/// Why a probe counted as unhealthy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeFailure {
    #[error("connection error: {0}")]
    Connect(String),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("timed out")]
    Timeout,
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Unhealthy(ProbeFailure),
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ProbeOutcome::Healthy)
    }
}

/// Effect a probe outcome had on the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Backend was in the pool and has been removed.
    Evicted,
    /// Backend was out of the pool and has been added back.
    Reinstated,
    /// Pool membership already matched the outcome.
    Unchanged,
}

/// Bring the pool in line with `outcome` for `addr`.
pub fn apply(pool: &ServerPool, addr: &BackendAddr, outcome: &ProbeOutcome) -> Transition {
    let changed = if outcome.is_healthy() {
        pool.add(addr)
    } else {
        pool.remove(addr)
    };

    match (changed, outcome.is_healthy()) {
        (false, _) => Transition::Unchanged,
        (true, true) => Transition::Reinstated,
        (true, false) => Transition::Evicted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_evicts_then_success_reinstates() {
        let s1 = BackendAddr::parse("s1:80").unwrap();
        let s2 = BackendAddr::parse("s2:80").unwrap();
        let pool = ServerPool::new([s1.clone(), s2.clone()]);

        let down = ProbeOutcome::Unhealthy(ProbeFailure::Timeout);
        assert_eq!(apply(&pool, &s1, &down), Transition::Evicted);
        assert_eq!(apply(&pool, &s1, &down), Transition::Unchanged);
        assert_eq!(pool.snapshot(), vec![s2.clone()]);

        assert_eq!(apply(&pool, &s1, &ProbeOutcome::Healthy), Transition::Reinstated);
        assert_eq!(apply(&pool, &s1, &ProbeOutcome::Healthy), Transition::Unchanged);
        assert_eq!(pool.snapshot(), vec![s2, s1]);
    }

    #[test]
    fn test_failure_kinds_are_all_unhealthy() {
        for failure in [
            ProbeFailure::Connect("refused".into()),
            ProbeFailure::Status(StatusCode::INTERNAL_SERVER_ERROR),
            ProbeFailure::Timeout,
        ] {
            assert!(!ProbeOutcome::Unhealthy(failure).is_healthy());
        }
        assert!(ProbeOutcome::Healthy.is_healthy());
    }
}
