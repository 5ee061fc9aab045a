//! Configuration types for Tablegate.
//!
//! Configuration is assembled from an optional YAML file and the fixed
//! environment variables `SERVICE_URL`, `SERVICE_KEY` and
//! `DIRECT_CONNECTION_STRING`, which take precedence over the file.
//!
//! ```yaml
//! connection:
//!   service_url: https://project.example.co
//! timeouts:
//!   direct_ms: 3000
//! context:
//!   max_tables: 25
//! mcp:
//!   transport: http
//!   port: 3100
//! ```

pub mod connection;
pub mod context;
pub mod mcp;

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use connection::{
    ConnectionConfig, DIRECT_CONNECTION_STRING_ENV, PoolConfig, SERVICE_KEY_ENV, SERVICE_URL_ENV,
    TimeoutConfig, redact_connection_string,
};
pub use context::ContextConfig;
pub use mcp::{McpConfig, Transport};

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "tablegate.yaml";

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Backend locations and credentials.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Per-call deadlines.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Direct connection pool.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Schema context injection.
    #[serde(default)]
    pub context: ContextConfig,

    /// MCP server.
    #[serde(default)]
    pub mcp: McpConfig,
}

impl GatewayConfig {
    /// Parse a YAML document.
    pub fn from_yaml(raw: &str) -> Result<Self, GatewayError> {
        serde_yaml::from_str(raw)
            .map_err(|e| GatewayError::configuration(format!("invalid configuration: {}", e)))
    }

    /// Load a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            GatewayError::configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&raw)
    }

    /// Load configuration from `path` (or `tablegate.yaml` when present),
    /// then apply the environment through `lookup`.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        Ok(file_config.with_env(lookup))
    }

    /// Load configuration using the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, GatewayError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Override connection settings with environment values.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = ConnectionConfig::from_lookup(lookup);
        self.connection = self.connection.merged_with(env);
        self
    }
}
