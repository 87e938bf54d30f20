//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Path;
use axum::http::{header::LOCATION, StatusCode};
use axum::routing::get;
use axum::Router;
use hash_balancer::config::BalancerConfig;
use hash_balancer::http::HttpServer;
use hash_balancer::lifecycle::Shutdown;
use hash_balancer::load_balancer::ServerPool;
use tokio::net::TcpListener;

/// A backend whose health endpoint can be switched off.
pub struct MockBackend {
    pub name: &'static str,
    pub addr: SocketAddr,
    pub healthy: Arc<AtomicBool>,
    pub hits: Arc<AtomicU32>,
}

impl MockBackend {
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Start a backend that answers every path with its name.
///
/// `/health` returns 200 or 500 depending on the health switch,
/// `/status/{code}` answers with the given status and `/moved` redirects
/// to `/landing`.
pub async fn start_backend(name: &'static str) -> MockBackend {
    let healthy = Arc::new(AtomicBool::new(true));
    let hits = Arc::new(AtomicU32::new(0));

    let health_flag = healthy.clone();
    let hit_counter = hits.clone();
    let app = Router::new()
        .route(
            "/health",
            get(move || {
                let healthy = health_flag.clone();
                async move {
                    if healthy.load(Ordering::SeqCst) {
                        StatusCode::OK
                    } else {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                }
            }),
        )
        .route(
            "/status/{code}",
            get(move |Path(code): Path<u16>| async move {
                let status = StatusCode::from_u16(code).unwrap_or(StatusCode::OK);
                (status, format!("{} says {}", name, code))
            }),
        )
        .route(
            "/moved",
            get(move || async move {
                (StatusCode::FOUND, [(LOCATION, "/landing")], format!("{} moved", name))
            }),
        )
        .fallback(move || {
            let hits = hit_counter.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                name
            }
        });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockBackend {
        name,
        addr,
        healthy,
        hits,
    }
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Config with fast probing and the trace header on.
pub fn test_config(backends: Vec<String>) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.backends = backends;
    config.health_check.interval_ms = 200;
    config.health_check.timeout_ms = Some(100);
    config.timeouts.request_secs = 2;
    config.observability.trace_header = true;
    config
}

/// A running balancer.
pub struct Proxy {
    pub addr: SocketAddr,
    pub pool: Arc<ServerPool>,
    pub shutdown: Shutdown,
}

impl Proxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for Proxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a balancer on an ephemeral port.
pub async fn start_proxy(config: BalancerConfig) -> Proxy {
    let server = HttpServer::new(config).unwrap();
    let pool = server.pool();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    Proxy {
        addr,
        pool,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}
