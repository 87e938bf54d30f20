//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server by its `host:port` address
//! - Validate addresses once, at start-up
//! - Build upstream request targets for the configured scheme

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::http::uri::{Authority, Uri};
use thiserror::Error;

/// Error produced when a configured backend address is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddrError {
    #[error("backend address is empty")]
    Empty,

    #[error("invalid backend address `{0}`: expected host:port")]
    Invalid(String),

    #[error("backend address `{0}` has no port")]
    MissingPort(String),
}

/// Scheme used to reach backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn from_https(https: bool) -> Self {
        if https {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one backend, e.g. `server1:8080`.
///
/// Immutable and cheap to clone; the pool and every in-flight request share
/// the same allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendAddr(Arc<str>);

impl BackendAddr {
    /// Parse and validate a `host:port` address.
    pub fn parse(input: &str) -> Result<Self, AddrError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AddrError::Empty);
        }

        let authority = Authority::from_str(trimmed)
            .map_err(|_| AddrError::Invalid(trimmed.to_string()))?;

        // Userinfo has no business in a backend address.
        if authority.as_str().contains('@') || authority.host().is_empty() {
            return Err(AddrError::Invalid(trimmed.to_string()));
        }
        if authority.port_u16().is_none() {
            return Err(AddrError::MissingPort(trimmed.to_string()));
        }

        Ok(Self(Arc::from(trimmed)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the upstream target for `path_and_query` on this backend.
    ///
    /// The path and query are carried over as-is; dot segments and
    /// percent-encoding are left for the backend to interpret.
    pub fn uri(&self, scheme: Scheme, path_and_query: &str) -> Result<Uri, axum::http::Error> {
        let path = if path_and_query.starts_with('/') {
            path_and_query
        } else {
            "/"
        };
        Uri::builder()
            .scheme(scheme.as_str())
            .authority(self.as_str())
            .path_and_query(path)
            .build()
    }
}

impl fmt::Display for BackendAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BackendAddr {
    type Err = AddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
