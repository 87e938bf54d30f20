//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Bind the listener
//! - Start the server (which starts health probing)
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Probing and serving start together; the pool begins with every backend

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::validation::describe;
use crate::config::{validate_config, BalancerConfig, ValidationError};
use crate::http::{HttpServer, ServerError};
use crate::lifecycle::Shutdown;

/// Error type for bringing the balancer up.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", describe(.0))]
    Config(Vec<ValidationError>),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Validate `config`, bind its listener and serve until `shutdown` fires.
pub async fn run(config: BalancerConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    validate_config(&config).map_err(StartupError::Config)?;

    let address = config.listener.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;
    Ok(())
}
