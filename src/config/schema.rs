//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Hard ceiling on the number of records the listing view returns.
pub const MAX_LIST_LIMIT: usize = 1000;

/// Root configuration for the capture gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The single upstream API every request is forwarded to.
    pub backend: BackendConfig,

    /// Call record database.
    pub storage: StorageConfig,

    /// Credentials injected into forwarded requests.
    pub auth: AuthConfig,

    /// Side-channel capture settings.
    pub capture: CaptureConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8090").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8090".to_string(),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL; the inbound path is appended to it verbatim.
    pub base_url: String,

    /// Honour HTTP_PROXY / HTTPS_PROXY from the environment.
    pub use_system_proxy: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            use_system_proxy: true,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub db_path: String,

    /// Number of records shown by the listing view (at most 1000).
    pub list_limit: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "./requests.db".to_string(),
            list_limit: MAX_LIST_LIMIT,
        }
    }
}

/// Credentials for the backend.
///
/// Empty strings are treated as unset.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// API key sent as a Bearer token. Takes precedence over `OPENAI_API_KEY`.
    pub api_key: String,

    /// Value for the `OpenAI-Organization` header.
    pub organization: String,
}

/// Capture side-channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// File overwritten with the raw backend body of the latest call.
    /// Empty disables the dump.
    pub response_dump_path: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            response_dump_path: "/tmp/gateway-response-body.json".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
