//! hash-balancer
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                 LOAD BALANCER                │
//!     Client Request     │  ┌──────────┐   ┌──────────┐   ┌─────────┐   │
//!     ───────────────────┼─▶│  http    │──▶│  client  │──▶│ forward │───┼──▶ Backend
//!                        │  │  server  │   │  hash    │   │         │   │
//!     Client Response    │  └──────────┘   └────┬─────┘   └─────────┘   │
//!     ◀──────────────────┼──────────────────────┼──────────────────────┼─── (streamed)
//!                        │                 snapshot                     │
//!                        │                 ┌────┴─────┐   ┌─────────┐   │
//!                        │                 │  server  │◀──│ health  │───┼──▶ GET /health
//!                        │                 │  pool    │   │ monitor │   │
//!                        │                 └──────────┘   └─────────┘   │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use hash_balancer::config::{self, BalancerConfig};
use hash_balancer::lifecycle::{signals, startup, Shutdown};
use hash_balancer::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "hash-balancer")]
#[command(about = "HTTP load balancer with client-hash routing and active health checks", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Load balancer port
    #[arg(long)]
    port: Option<u16>,

    /// Request timeout time in seconds
    #[arg(long = "timeout-sec")]
    timeout_sec: Option<u64>,

    /// Whether backends support HTTPS (`--https=false` overrides the file)
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    https: Option<bool>,

    /// Whether to include tracing information into responses
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    trace: Option<bool>,

    /// Backend address (host:port); repeat to list several
    #[arg(long = "backend")]
    backends: Vec<String>,
}

impl Cli {
    /// Layer command-line values over `config`.
    fn apply(&self, config: &mut BalancerConfig) {
        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if let Some(secs) = self.timeout_sec {
            config.timeouts.request_secs = secs;
        }
        if let Some(https) = self.https {
            config.upstream.https = https;
        }
        if let Some(trace) = self.trace {
            config.observability.trace_header = trace;
        }
        if !self.backends.is_empty() {
            config.backends = self.backends.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::read_config(path)?,
        None => BalancerConfig::default(),
    };
    cli.apply(&mut config);

    logging::init_logging(&config.observability.log_level)?;

    tracing::info!("Balancer started");
    tracing::info!(
        port = config.listener.port,
        backends = ?config.backends,
        request_timeout_secs = config.timeouts.request_secs,
        https = config.upstream.https,
        "Configuration loaded"
    );
    tracing::info!("Tracing support enabled: {}", config.observability.trace_header);

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let _signals = signals::spawn_signal_handler(shutdown.clone());

    startup::run(config, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "hash-balancer",
            "--port",
            "9000",
            "--timeout-sec",
            "5",
            "--trace",
            "--backend",
            "a:80",
            "--backend",
            "b:80",
        ]);
        let mut config = BalancerConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.timeouts.request_secs, 5);
        assert!(config.observability.trace_header);
        assert!(!config.upstream.https);
        assert_eq!(config.backends, vec!["a:80", "b:80"]);
    }

    #[test]
    fn test_flags_can_switch_file_settings_off() {
        let mut config = config::parse_config(
            r#"
            [upstream]
            https = true

            [observability]
            trace_header = true
            "#,
        )
        .unwrap();

        Cli::parse_from(["hash-balancer"]).apply(&mut config);
        assert!(config.upstream.https);
        assert!(config.observability.trace_header);

        Cli::parse_from(["hash-balancer", "--https=false", "--trace=false"]).apply(&mut config);
        assert!(!config.upstream.https);
        assert!(!config.observability.trace_header);

        Cli::parse_from(["hash-balancer", "--https"]).apply(&mut config);
        assert!(config.upstream.https);
    }

    #[test]
    fn test_no_flags_keep_defaults() {
        let cli = Cli::parse_from(["hash-balancer"]);
        let mut config = BalancerConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.listener.port, 8090);
        assert_eq!(config.backends.len(), 3);
    }
}
