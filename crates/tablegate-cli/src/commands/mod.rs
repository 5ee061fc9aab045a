//! CLI command implementations.

pub mod inspect;
pub mod query;
pub mod serve;

use crate::connector::LiveConnector;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tablegate_core::{CommandResult, GatewayConfig};
use tablegate_mcp::CommandRouter;
use tablegate_runtime::{ConnectionManager, SchemaIntrospector};

/// Everything a command needs, wired from configuration.
pub struct Gateway {
    pub config: GatewayConfig,
    pub introspector: Arc<SchemaIntrospector>,
    pub router: Arc<CommandRouter>,
}

impl Gateway {
    /// Load configuration and open both backends.
    pub async fn connect(config_path: Option<&Path>) -> Result<Self> {
        let config = GatewayConfig::load(config_path).context("Failed to load configuration")?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: GatewayConfig) -> Result<Self> {
        let connector = LiveConnector::new(config.pool.clone(), config.timeouts.managed());
        let connections = ConnectionManager::initialize(
            config.connection.clone(),
            &connector,
            config.timeouts.connect(),
        )
        .await
        .context("Failed to initialize backends")?;

        let state = connections.state();
        tracing::info!(
            direct = state.direct_available,
            managed = state.managed_available,
            "Backends initialized"
        );

        let introspector = Arc::new(SchemaIntrospector::new(
            Arc::new(connections),
            config.timeouts.clone(),
        ));
        let router = Arc::new(CommandRouter::new(
            introspector.clone(),
            config.timeouts.clone(),
        ));

        Ok(Self {
            config,
            introspector,
            router,
        })
    }
}

/// Print a result as pretty JSON; failures exit non-zero.
pub fn print_result(result: &CommandResult) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
