//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::BalancerConfig;
use crate::config::validation::{describe, validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", describe(.0))]
    Validation(Vec<ValidationError>),
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<BalancerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Read a TOML file without validating it.
///
/// Callers that layer command-line overrides on top validate afterwards.
pub fn read_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BalancerConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_minimal_document_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.port, 8090);
        assert_eq!(config.timeouts.request_secs, 3);
        assert!(!config.upstream.https);
        assert!(!config.observability.trace_header);
        assert_eq!(config.backends.len(), 3);
        assert_eq!(config.health_check.path, "/health");
    }

    #[test]
    fn test_full_document() {
        let config = parse_config(
            r#"
            backends = ["10.0.0.1:8080", "10.0.0.2:8080"]

            [listener]
            port = 9000

            [timeouts]
            request_secs = 5

            [upstream]
            https = true

            [health_check]
            interval_ms = 1000
            timeout_ms = 250

            [routing]
            hash_seed = 1234

            [observability]
            trace_header = true
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.backends, vec!["10.0.0.1:8080", "10.0.0.2:8080"]);
        assert_eq!(config.timeouts.request_secs, 5);
        assert!(config.upstream.https);
        assert_eq!(config.probe_timeout().as_millis(), 250);
        assert_eq!(config.routing.hash_seed, Some(1234));
        assert!(config.observability.trace_header);
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[listener]\nport = \"eighty\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!("hash-balancer-{}.toml", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "backends = []").unwrap();
        drop(file);

        let err = load_config(&path).unwrap_err();
        let _ = fs::remove_file(&path);

        match err {
            ConfigError::Validation(errors) => {
                assert_eq!(errors, vec![ValidationError::NoBackends]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
