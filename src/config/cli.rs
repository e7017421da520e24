//! Command-line flags.
//!
//! Flags override values read from the optional TOML file; the merged result
//! is validated once.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{read_config, ConfigError};
use crate::config::schema::GatewayConfig;
use crate::config::validation::validate_config;

#[derive(Debug, Parser)]
#[command(name = "capture-gateway")]
#[command(about = "Forwarding gateway that records every completion call", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address of the backend service
    #[arg(long)]
    pub backend: Option<String>,

    /// Address to listen on (":8090" binds every interface)
    #[arg(long = "listen-on", alias = "listen_on")]
    pub listen_on: Option<String>,

    /// Path to the requests database
    #[arg(long = "db-file", alias = "db_file")]
    pub db_file: Option<String>,

    /// API key sent to the backend
    #[arg(long = "api-key", alias = "api_key")]
    pub api_key: Option<String>,

    /// OpenAI organization
    #[arg(long = "openai-org", alias = "openai_org")]
    pub openai_org: Option<String>,

    /// Log level override
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Build the effective configuration: file (or defaults), then flags.
    pub fn resolve(&self) -> Result<GatewayConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => GatewayConfig::default(),
        };
        self.apply_to(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn apply_to(&self, config: &mut GatewayConfig) {
        if let Some(backend) = &self.backend {
            config.backend.base_url = backend.clone();
        }
        if let Some(listen_on) = &self.listen_on {
            config.listener.bind_address = normalize_listen_address(listen_on);
        }
        if let Some(db_file) = &self.db_file {
            config.storage.db_path = db_file.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.auth.api_key = api_key.clone();
        }
        if let Some(org) = &self.openai_org {
            config.auth.organization = org.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

fn normalize_listen_address(raw: &str) -> String {
    match raw.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "capture-gateway",
            "--backend",
            "http://localhost:9999/v1",
            "--listen-on",
            ":8181",
            "--db-file",
            "/var/lib/gateway/requests.db",
            "--api-key",
            "sk-test",
            "--openai-org",
            "org-test",
        ]);
        let config = cli.resolve().unwrap();

        assert_eq!(config.backend.base_url, "http://localhost:9999/v1");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8181");
        assert_eq!(config.storage.db_path, "/var/lib/gateway/requests.db");
        assert_eq!(config.auth.api_key, "sk-test");
        assert_eq!(config.auth.organization, "org-test");
    }

    #[test]
    fn flags_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.toml");
        std::fs::write(
            &path,
            "[backend]\nbase_url = \"http://file:1/v1\"\n[auth]\napi_key = \"from-file\"\n",
        )
        .unwrap();

        let cli = Cli::parse_from([
            "capture-gateway",
            "--config",
            path.to_str().unwrap(),
            "--api-key",
            "from-flag",
        ]);
        let config = cli.resolve().unwrap();

        assert_eq!(config.backend.base_url, "http://file:1/v1");
        assert_eq!(config.auth.api_key, "from-flag");
    }

    #[test]
    fn invalid_flag_values_fail_validation() {
        let cli = Cli::parse_from(["capture-gateway", "--backend", "::nope::"]);
        assert!(matches!(cli.resolve(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn listen_address_keeps_explicit_host() {
        assert_eq!(normalize_listen_address("127.0.0.1:8090"), "127.0.0.1:8090");
        assert_eq!(normalize_listen_address(":8090"), "0.0.0.0:8090");
    }
}
