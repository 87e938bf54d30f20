//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite the inbound request to target the chosen backend
//! - Bound the whole exchange by the configured timeout
//! - Stream bodies in both directions
//!
//! # Design Decisions
//! - No retries; a failed forward fails that one request
//! - Redirects are relayed to the client, never followed
//! - Dropping the returned future (client went away) drops the upstream request
//! - The timeout covers connect, response head and response body

use std::time::Duration;

use axum::body::{Body, BodyDataStream, Bytes};
use axum::http::{HeaderValue, Request};
use axum::response::Response;
use axum::BoxError;
use futures_util::{stream, StreamExt};
use thiserror::Error;
use tokio::time::{self, Instant};

use crate::http::client::UpstreamClient;
use crate::http::request::{outbound_headers, strip_hop_by_hop};
use crate::http::response::LB_FROM;
use crate::load_balancer::{BackendAddr, Scheme};

/// Error type for a failed forward.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream target: {0}")]
    InvalidTarget(#[from] axum::http::Error),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream connection failed: {0}")]
    Connect(#[source] hyper_util::client::legacy::Error),

    #[error("upstream request failed: {0}")]
    Request(#[source] hyper_util::client::legacy::Error),
}

/// Sends client requests to backends and relays the answers.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: UpstreamClient,
    scheme: Scheme,
    timeout: Duration,
    trace: bool,
}

impl Forwarder {
    pub fn new(client: UpstreamClient, scheme: Scheme, timeout: Duration, trace: bool) -> Self {
        Self {
            client,
            scheme,
            timeout,
            trace,
        }
    }

    /// Forward `request` to `backend` and build the client response.
    pub async fn forward(
        &self,
        backend: &BackendAddr,
        request: Request<Body>,
    ) -> Result<Response, ForwardError> {
        let deadline = Instant::now() + self.timeout;
        let (parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let uri = backend.uri(self.scheme, path_and_query)?;

        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(body)?;
        *outbound.headers_mut() = outbound_headers(&parts.headers);

        let upstream = match time::timeout_at(deadline, self.client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_connect() => return Err(ForwardError::Connect(e)),
            Ok(Err(e)) => return Err(ForwardError::Request(e)),
            Err(_) => return Err(ForwardError::Timeout(self.timeout)),
        };

        let (mut head, incoming) = upstream.into_parts();
        strip_hop_by_hop(&mut head.headers);

        if self.trace {
            match HeaderValue::from_str(backend.as_str()) {
                Ok(value) => {
                    head.headers.insert(LB_FROM, value);
                }
                Err(e) => {
                    tracing::warn!(backend = %backend, error = %e, "Cannot encode trace header");
                }
            }
        }

        let body = bounded_body(Body::new(incoming), deadline, self.timeout);
        Ok(Response::from_parts(head, body))
    }
}

/// Relay `body` until `deadline`, then fail the stream.
fn bounded_body(body: Body, deadline: Instant, timeout: Duration) -> Body {
    let chunks = stream::unfold(Some(body.into_data_stream()), move |state: Option<BodyDataStream>| async move {
        let mut data = state?;
        match time::timeout_at(deadline, data.next()).await {
            Ok(Some(Ok(chunk))) => Some((Ok::<Bytes, BoxError>(chunk), Some(data))),
            Ok(Some(Err(e))) => Some((Err(e.into()), None)),
            Ok(None) => None,
            Err(_) => Some((Err(ForwardError::Timeout(timeout).into()), None)),
        }
    });
    Body::from_stream(chunks)
}
