//! Schema context injection for agent sessions.
//!
//! At session start a compact schema summary is appended to the agent's
//! system message between `<!-- DB_SCHEMA_START -->` and
//! `<!-- DB_SCHEMA_END -->`. Building the summary never blocks a session:
//! introspection failures shrink the summary instead of failing.

use crate::render::render_schema_summary;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tablegate_core::{ContextConfig, GatewayError};
use tablegate_runtime::SchemaIntrospector;

pub const SCHEMA_START: &str = "<!-- DB_SCHEMA_START -->";
pub const SCHEMA_END: &str = "<!-- DB_SCHEMA_END -->";

// =============================================================================
// CHAT MESSAGES
// =============================================================================

/// A chat message as exchanged with the agent framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

/// Plain text, or a list of typed parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(text.into()),
            extra: Map::new(),
        }
    }
}

impl MessageContent {
    fn contains_schema(&self) -> bool {
        match self {
            Self::Text(text) => has_schema_block(text),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .any(has_schema_block),
        }
    }
}

// =============================================================================
// DELIMITED BLOCKS
// =============================================================================

fn has_schema_block(text: &str) -> bool {
    text.contains(SCHEMA_START) && text.contains(SCHEMA_END)
}

/// Wrap a summary in schema delimiters, separated from preceding text.
pub fn wrap_schema(summary: &str) -> String {
    format!("\n\n{}\n{}\n{}", SCHEMA_START, summary, SCHEMA_END)
}

/// The trimmed text between the delimiters, if a block is present.
pub fn extract_schema_info(text: &str) -> Option<String> {
    let start = text.find(SCHEMA_START)? + SCHEMA_START.len();
    let end = text[start..].find(SCHEMA_END)? + start;
    Some(text[start..end].trim().to_string())
}

fn strip_schema_block(text: &str) -> Option<String> {
    let start = text.find(SCHEMA_START)?;
    let end = text[start..].find(SCHEMA_END)? + start + SCHEMA_END.len();
    Some(format!("{}{}", text[..start].trim_end(), &text[end..]))
}

/// Remove schema blocks from every non-system message.
pub fn clean_schema_from_messages(messages: &mut [ChatMessage]) {
    for message in messages.iter_mut().filter(|m| !m.is_system()) {
        match &mut message.content {
            MessageContent::Text(text) => {
                while let Some(cleaned) = strip_schema_block(text) {
                    *text = cleaned;
                }
            }
            MessageContent::Parts(parts) => {
                for text in parts.iter_mut().filter_map(|p| p.text.as_mut()) {
                    while let Some(cleaned) = strip_schema_block(text) {
                        *text = cleaned;
                    }
                }
            }
        }
    }
}

// =============================================================================
// AGENT SETTINGS
// =============================================================================

/// Per-agent settings, stored as `<settings_dir>/<agent>.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Tables included in the schema summary. Empty means every table.
    #[serde(default)]
    pub enabled_tables: Vec<String>,
}

impl AgentSettings {
    /// Load settings; missing or unreadable files give the defaults.
    pub fn load(dir: &Path, agent: &str) -> Self {
        let Some(path) = settings_path(dir, agent) else {
            tracing::warn!(agent, "Invalid agent name; using default settings");
            return Self::default();
        };
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable agent settings; using defaults");
                Self::default()
            }
        }
    }

    /// Save settings, creating the directory when needed.
    pub fn save(&self, dir: &Path, agent: &str) -> Result<PathBuf, GatewayError> {
        let path = settings_path(dir, agent)
            .ok_or_else(|| GatewayError::validation(format!("invalid agent name '{}'", agent)))?;
        fs::create_dir_all(dir).map_err(|e| {
            GatewayError::configuration(format!("cannot create {}: {}", dir.display(), e))
        })?;
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| GatewayError::configuration(format!("cannot encode settings: {}", e)))?;
        fs::write(&path, contents).map_err(|e| {
            GatewayError::configuration(format!("cannot write {}: {}", path.display(), e))
        })?;
        Ok(path)
    }

    fn table_filter(&self) -> Option<BTreeSet<&str>> {
        if self.enabled_tables.is_empty() {
            None
        } else {
            Some(self.enabled_tables.iter().map(String::as_str).collect())
        }
    }
}

fn settings_path(dir: &Path, agent: &str) -> Option<PathBuf> {
    let valid = !agent.is_empty()
        && agent
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then(|| dir.join(format!("{}.json", agent)))
}

// =============================================================================
// CONTEXT INJECTOR
// =============================================================================

/// Builds schema summaries and injects them into agent sessions.
pub struct ContextInjector {
    introspector: Arc<SchemaIntrospector>,
    config: ContextConfig,
}

impl ContextInjector {
    pub fn new(introspector: Arc<SchemaIntrospector>, config: ContextConfig) -> Self {
        Self {
            introspector,
            config,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Summary of every table, up to the table ceiling.
    pub async fn build_schema_summary(&self) -> String {
        self.build_summary(None).await
    }

    /// Summary restricted to an agent's enabled tables.
    pub async fn summary_for_agent(&self, agent: &str) -> String {
        let settings = AgentSettings::load(&self.config.settings_dir, agent);
        self.build_summary(settings.table_filter().as_ref()).await
    }

    async fn build_summary(&self, only: Option<&BTreeSet<&str>>) -> String {
        let tables = match self.introspector.list_tables().await {
            Ok(listed) => listed.value,
            Err(e) => {
                tracing::warn!(error = %e, "Schema summary unavailable: tables cannot be listed");
                return String::new();
            }
        };

        let selected: Vec<String> = tables
            .into_iter()
            .filter(|t| only.is_none_or(|set| set.contains(t.as_str())))
            .collect();
        let omitted = selected.len().saturating_sub(self.config.max_tables);

        let mut described = Vec::new();
        for table in selected.iter().take(self.config.max_tables) {
            match self.introspector.describe_table(table).await {
                Ok(d) => described.push(d.value),
                Err(e) => {
                    tracing::warn!(table = %table, error = %e, "Skipping table in schema summary");
                }
            }
        }

        if described.is_empty() {
            return String::new();
        }
        tracing::info!(
            tables = described.len(),
            omitted,
            "Built schema summary"
        );
        render_schema_summary(&described, omitted)
    }

    /// Append the agent's schema summary to the leading system message.
    ///
    /// Returns whether a block was added. Sessions without a leading system
    /// message, or whose system message already carries a block, are left
    /// untouched, as are sessions for which no summary could be built.
    pub async fn inject_schema(&self, agent: &str, messages: &mut [ChatMessage]) -> bool {
        let Some(system) = messages.first().filter(|m| m.is_system()) else {
            tracing::debug!(agent, "No system message; schema not injected");
            return false;
        };
        if system.content.contains_schema() {
            return false;
        }

        let summary = self.summary_for_agent(agent).await;
        if summary.is_empty() {
            return false;
        }
        let block = wrap_schema(&summary);

        let Some(system) = messages.first_mut() else {
            return false;
        };
        match &mut system.content {
            MessageContent::Text(text) => text.push_str(&block),
            MessageContent::Parts(parts) => parts.push(ContentPart::text(block)),
        }
        tracing::debug!(agent, "Injected schema summary into system message");
        true
    }
}
