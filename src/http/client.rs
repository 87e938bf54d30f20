//! Upstream HTTP client shared by forwarding and health probing.
//!
//! The client never follows redirects and sends the request target exactly
//! as given.

use axum::body::Body;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Build a client that speaks plain HTTP and HTTPS.
pub fn upstream_client() -> UpstreamClient {
    let connector = HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();

    Client::builder(TokioExecutor::new()).build(connector)
}
