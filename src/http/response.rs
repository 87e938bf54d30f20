//! Client-facing failures.
//!
//! # Design Decisions
//! - No backend and a failed forward both answer 503 Service Unavailable
//! - Upstream error details go to the log, not to the client

use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::http::forward::ForwardError;

/// Response header naming the backend that served a request.
pub const LB_FROM: HeaderName = HeaderName::from_static("lb-from");

/// Terminal failure of one proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("no backend available")]
    NoBackend,

    #[error(transparent)]
    Upstream(#[from] ForwardError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ProxyError::NoBackend => "No backend available",
            ProxyError::Upstream(_) => "Upstream request failed",
        };
        (status, message).into_response()
    }
}
