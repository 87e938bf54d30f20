//! Active health checking.
//!
//! # Responsibilities
//! - Run one probing task per configured backend
//! - Evict backends that fail a probe, reinstate those that pass again

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header::USER_AGENT, Request, StatusCode};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::health::state::{self, ProbeFailure, ProbeOutcome, Transition};
use crate::http::client::UpstreamClient;
use crate::load_balancer::{BackendAddr, Scheme, ServerPool};
use crate::observability::metrics;

const PROBE_USER_AGENT: &str = "hash-balancer-health-check";

/// Issues single health probes.
#[derive(Debug, Clone)]
pub struct Prober {
    client: UpstreamClient,
    scheme: Scheme,
    path: String,
    timeout: Duration,
}

impl Prober {
    pub fn new(client: UpstreamClient, scheme: Scheme, path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            scheme,
            path: path.into(),
            timeout,
        }
    }

    /// Probe `addr` once. Only a 200 within the timeout counts as healthy;
    /// redirects are not followed.
    pub async fn probe(&self, addr: &BackendAddr) -> ProbeOutcome {
        let request = match addr
            .uri(self.scheme, &self.path)
            .and_then(|uri| {
                Request::get(uri)
                    .header(USER_AGENT, PROBE_USER_AGENT)
                    .body(Body::empty())
            }) {
            Ok(request) => request,
            Err(e) => return ProbeOutcome::Unhealthy(ProbeFailure::Connect(e.to_string())),
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status() == StatusCode::OK => ProbeOutcome::Healthy,
            Ok(Ok(response)) => ProbeOutcome::Unhealthy(ProbeFailure::Status(response.status())),
            Ok(Err(e)) => ProbeOutcome::Unhealthy(ProbeFailure::Connect(e.to_string())),
            Err(_) => ProbeOutcome::Unhealthy(ProbeFailure::Timeout),
        }
    }
}

/// Keeps the server pool in line with backend liveness.
pub struct HealthMonitor {
    pool: Arc<ServerPool>,
    backends: Vec<BackendAddr>,
    prober: Prober,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(
        pool: Arc<ServerPool>,
        backends: Vec<BackendAddr>,
        prober: Prober,
        interval: Duration,
    ) -> Self {
        Self {
            pool,
            backends,
            prober,
            interval,
        }
    }

    /// Start one probing task per backend. Tasks stop on the shutdown signal.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> Vec<JoinHandle<()>> {
        tracing::info!(
            backends = self.backends.len(),
            interval_ms = self.interval.as_millis() as u64,
            "Health monitor starting"
        );

        self.backends
            .iter()
            .map(|addr| {
                let watcher = Watcher {
                    pool: self.pool.clone(),
                    prober: self.prober.clone(),
                    addr: addr.clone(),
                    interval: self.interval,
                };
                tokio::spawn(watcher.run(shutdown.resubscribe()))
            })
            .collect()
    }
}

/// Probing loop for one backend.
struct Watcher {
    pool: Arc<ServerPool>,
    prober: Prober,
    addr: BackendAddr,
    interval: Duration,
}

impl Watcher {
    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check().await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!(addr = %self.addr, "Health probe task exiting");
                    break;
                }
            }
        }
    }

    async fn check(&self) {
        let outcome = self.prober.probe(&self.addr).await;
        let transition = state::apply(&self.pool, &self.addr, &outcome);

        match (&outcome, transition) {
            (ProbeOutcome::Unhealthy(failure), Transition::Evicted) => {
                tracing::warn!(addr = %self.addr, reason = %failure, pool_size = self.pool.len(), "Backend evicted");
            }
            (ProbeOutcome::Unhealthy(failure), _) => {
                tracing::debug!(addr = %self.addr, reason = %failure, "Backend still unhealthy");
            }
            (ProbeOutcome::Healthy, Transition::Reinstated) => {
                tracing::info!(addr = %self.addr, pool_size = self.pool.len(), "Backend reinstated");
            }
            (ProbeOutcome::Healthy, _) => {
                tracing::trace!(addr = %self.addr, "Backend healthy");
            }
        }

        metrics::record_backend_health(self.addr.as_str(), outcome.is_healthy());
        metrics::record_pool_size(self.pool.len());
    }
}
