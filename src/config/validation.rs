//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate backend addresses and reject duplicates
//! - Validate value ranges (timeouts > 0, probe timeout below the interval)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::BalancerConfig;
use crate::load_balancer::backend::{AddrError, BackendAddr};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,

    #[error("backend #{index}: {source}")]
    InvalidBackend { index: usize, source: AddrError },

    #[error("backend `{0}` is listed more than once")]
    DuplicateBackend(String),

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("health_check.interval_ms must be greater than zero")]
    ZeroProbeInterval,

    #[error("probe timeout must be greater than zero")]
    ZeroProbeTimeout,

    #[error("probe timeout ({timeout_ms}ms) must be shorter than the probe interval ({interval_ms}ms)")]
    ProbeTimeoutTooLong { timeout_ms: u128, interval_ms: u128 },

    #[error("health_check.path `{0}` must start with '/'")]
    InvalidProbePath(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check `config` for semantic errors, collecting every one found.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    let mut seen = HashSet::new();
    for (index, raw) in config.backends.iter().enumerate() {
        match BackendAddr::parse(raw) {
            Ok(addr) => {
                if !seen.insert(addr.clone()) {
                    errors.push(ValidationError::DuplicateBackend(addr.to_string()));
                }
            }
            Err(source) => errors.push(ValidationError::InvalidBackend { index, source }),
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let interval = config.probe_interval();
    let timeout = config.probe_timeout();
    if interval.is_zero() {
        errors.push(ValidationError::ZeroProbeInterval);
    }
    if timeout.is_zero() {
        errors.push(ValidationError::ZeroProbeTimeout);
    }
    if !interval.is_zero() && !timeout.is_zero() && timeout >= interval {
        errors.push(ValidationError::ProbeTimeoutTooLong {
            timeout_ms: timeout.as_millis(),
            interval_ms: interval.as_millis(),
        });
    }

    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::InvalidProbePath(
            config.health_check.path.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// One-line summary of `errors`, for logs and error messages.
pub fn describe(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
