//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler for every method and path
//! - Wire up middleware (tracing, request ID)
//! - Derive the selection key from the client's remote address
//! - Select a backend from the pool and forward the request
//! - Start the health monitor alongside the listener

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::BalancerConfig;
use crate::health::{HealthMonitor, Prober};
use crate::http::client::{upstream_client, UpstreamClient};
use crate::http::forward::Forwarder;
use crate::http::response::ProxyError;
use crate::load_balancer::{AddrError, BackendAddr, ClientHash, LoadBalancer, Scheme, ServerPool};
use crate::observability::metrics;

/// Error type for building or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid backend: {0}")]
    Backend(#[from] AddrError),

    #[error("server IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<ServerPool>,
    pub balancer: Arc<dyn LoadBalancer>,
    pub forwarder: Forwarder,
}

/// HTTP frontend of the load balancer.
pub struct HttpServer {
    router: Router,
    config: BalancerConfig,
    backends: Vec<BackendAddr>,
    pool: Arc<ServerPool>,
    client: UpstreamClient,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// The pool starts out holding every configured backend.
    pub fn new(config: BalancerConfig) -> Result<Self, ServerError> {
        let backends = config
            .backends
            .iter()
            .map(|raw| BackendAddr::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;
        let pool = Arc::new(ServerPool::new(backends.clone()));

        // Shared by forwarding and probing.
        let client = upstream_client();

        let balancer = ClientHash::from_seed(config.routing.hash_seed);
        tracing::debug!(seed = balancer.seed(), "Routing digest seeded");

        let forwarder = Forwarder::new(
            client.clone(),
            Scheme::from_https(config.upstream.https),
            config.request_timeout(),
            config.observability.trace_header,
        );

        let state = AppState {
            pool: pool.clone(),
            balancer: Arc::new(balancer),
            forwarder,
        };

        let router = Self::build_router(state);
        Ok(Self {
            router,
            config,
            backends,
            pool,
            client,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The configured router, for serving or for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The live server pool.
    pub fn pool(&self) -> Arc<ServerPool> {
        self.pool.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.backends.len(),
            trace_header = self.config.observability.trace_header,
            "HTTP server starting"
        );

        let prober = Prober::new(
            self.client.clone(),
            Scheme::from_https(self.config.upstream.https),
            self.config.health_check.path.clone(),
            self.config.probe_timeout(),
        );
        let monitor = HealthMonitor::new(
            self.pool.clone(),
            self.backends.clone(),
            prober,
            self.config.probe_interval(),
        );
        let probes = monitor.spawn(shutdown.resubscribe());
        metrics::record_pool_size(self.pool.len());

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        for probe in probes {
            let _ = probe.await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Picks a backend for the client's address and forwards the request.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let key = peer.to_string();

    let servers = state.pool.snapshot();
    let Some(backend) = state.balancer.select(&key, &servers) else {
        tracing::warn!(client = %key, method = %method, path = %path, "No backend available");
        metrics::record_request(&method, 503, metrics::NO_BACKEND, start_time);
        return ProxyError::NoBackend.into_response();
    };

    tracing::debug!(
        client = %key,
        backend = %backend,
        method = %method,
        path = %path,
        "Forwarding request"
    );

    match state.forwarder.forward(&backend, request).await {
        Ok(response) => {
            let status = response.status();
            tracing::info!(backend = %backend, status = status.as_u16(), path = %path, "fwd");
            metrics::record_request(&method, status.as_u16(), backend.as_str(), start_time);
            response
        }
        Err(e) => {
            tracing::error!(backend = %backend, error = %e, path = %path, "Failed to get response from backend");
            let error = ProxyError::from(e);
            metrics::record_request(&method, error.status().as_u16(), backend.as_str(), start_time);
            error.into_response()
        }
    }
}
