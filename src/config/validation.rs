//! Configuration validation.
//!
//! Serde handles the syntax; this pass checks values. It is a pure function
//! that reports every problem found, not just the first.

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::{GatewayConfig, MAX_LIST_LIMIT};

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("backend.base_url `{0}` is not a valid URL: {1}")]
    InvalidBackendUrl(String, String),

    #[error("backend.base_url scheme `{0}` is not http or https")]
    UnsupportedScheme(String),

    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("storage.db_path must not be empty")]
    EmptyDatabasePath,

    #[error("storage.list_limit must be between 1 and {MAX_LIST_LIMIT}, got {0}")]
    ListLimitOutOfRange(usize),

    #[error("observability.log_level `{0}` is not one of trace, debug, info, warn, error, off")]
    UnknownLogLevel(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.backend.base_url) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => {
            errors.push(ValidationError::UnsupportedScheme(url.scheme().to_string()));
        }
        Ok(_) => {}
        Err(e) => errors.push(ValidationError::InvalidBackendUrl(
            config.backend.base_url.clone(),
            e.to_string(),
        )),
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.storage.db_path.trim().is_empty() {
        errors.push(ValidationError::EmptyDatabasePath);
    }

    if !(1..=MAX_LIST_LIMIT).contains(&config.storage.list_limit) {
        errors.push(ValidationError::ListLimitOutOfRange(config.storage.list_limit));
    }

    let level = config.observability.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = GatewayConfig::default();
        config.backend.base_url = "not a url".into();
        config.listener.bind_address = ":8090".into();
        config.storage.list_limit = 5000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ValidationError::InvalidBackendUrl(..)));
        assert_eq!(errors[1], ValidationError::InvalidBindAddress(":8090".into()));
        assert_eq!(errors[2], ValidationError::ListLimitOutOfRange(5000));
    }

    #[test]
    fn rejects_non_http_backend() {
        let mut config = GatewayConfig::default();
        config.backend.base_url = "ftp://example.com/v1".into();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::UnsupportedScheme("ftp".into())])
        );
    }

    #[test]
    fn metrics_address_only_checked_when_enabled() {
        let mut config = GatewayConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidMetricsAddress("nowhere".into())])
        );
    }
}
