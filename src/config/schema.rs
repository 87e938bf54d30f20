//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the load balancer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// Listener configuration (bind host, port).
    pub listener: ListenerConfig,

    /// Backend addresses (`host:port`), in pool order.
    pub backends: Vec<String>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// How backends are reached.
    pub upstream: UpstreamConfig,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Backend selection settings.
    pub routing: RoutingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            backends: vec![
                "server1:8080".to_string(),
                "server2:8080".to_string(),
                "server3:8080".to_string(),
            ],
            timeouts: TimeoutConfig::default(),
            upstream: UpstreamConfig::default(),
            health_check: HealthCheckConfig::default(),
            routing: RoutingConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl BalancerConfig {
    /// Deadline for one forwarded request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.request_secs)
    }

    /// Deadline for one health probe.
    ///
    /// Without an explicit value this is the request timeout, capped at half
    /// the probe interval.
    pub fn probe_timeout(&self) -> Duration {
        match self.health_check.timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.request_timeout().min(self.probe_interval() / 2),
        }
    }

    /// Time between two probes of the same backend.
    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.health_check.interval_ms)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// Listening port.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8090,
        }
    }
}

impl ListenerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 3 }
    }
}

/// Upstream connection settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Reach backends over HTTPS instead of HTTP.
    pub https: bool,
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Probe interval in milliseconds.
    pub interval_ms: u64,

    /// Probe timeout in milliseconds. Defaults to the request timeout,
    /// capped at half the interval.
    pub timeout_ms: Option<u64>,

    /// Path to probe.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            timeout_ms: None,
            path: "/health".to_string(),
        }
    }
}

/// Backend selection configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Fixed seed for the routing digest. Random per process when unset.
    pub hash_seed: Option<u64>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Add the `lb-from` header to forwarded responses.
    pub trace_header: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            trace_header: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
