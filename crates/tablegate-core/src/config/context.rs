//! Schema context injection settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Controls the schema summary injected at agent-session start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Whether a schema summary is built at session start.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Upper bound on the number of tables described in a summary.
    #[serde(default = "default_max_tables")]
    pub max_tables: usize,

    /// Directory holding per-agent settings files (`<agent>.json`).
    #[serde(default = "default_settings_dir")]
    pub settings_dir: PathBuf,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_tables: default_max_tables(),
            settings_dir: default_settings_dir(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_tables() -> usize {
    50
}

fn default_settings_dir() -> PathBuf {
    PathBuf::from("data/db/agent_settings")
}
