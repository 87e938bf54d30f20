//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (client ip:port)
//!     → server.rs (Axum setup, request ID, select backend)
//!     → request.rs (strip hop-by-hop headers, drop Host)
//!     → forward.rs (rewrite target, bounded upstream call via client.rs)
//!     → response.rs (503 on failure, `lb-from` when tracing)
//!     → Send to client
//! ```

pub mod client;
pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use client::{upstream_client, UpstreamClient};
pub use forward::{ForwardError, Forwarder};
pub use response::{ProxyError, LB_FROM};
pub use server::{AppState, HttpServer, ServerError};
