//! Connection manager.
//!
//! Opens the managed client (required) and the direct connection (optional)
//! once at startup. Availability is fixed for the lifetime of a manager; a
//! new manager is built by [`ConnectionManager::reconnect`].

use crate::backend::{BackendConnector, DirectBackend, ManagedBackend};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tablegate_core::config::redact_connection_string;
use tablegate_core::{ConnectionConfig, GatewayError};

/// Which backends are usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendState {
    pub direct_available: bool,
    pub managed_available: bool,
}

/// Process-wide, read-only handles to both backends.
pub struct ConnectionManager {
    config: ConnectionConfig,
    direct: Option<Arc<dyn DirectBackend>>,
    managed: Arc<dyn ManagedBackend>,
}

impl ConnectionManager {
    /// Open both backends.
    ///
    /// Missing or invalid managed-client settings fail with a configuration
    /// error before anything is contacted. A direct connection that cannot be
    /// opened is logged and recorded as unavailable.
    pub async fn initialize(
        config: ConnectionConfig,
        connector: &dyn BackendConnector,
        connect_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let (service_url, service_key) = config.validate_managed()?;

        let managed = match tokio::time::timeout(
            connect_timeout,
            connector.connect_managed(service_url, service_key),
        )
        .await
        {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => {
                return Err(GatewayError::configuration(format!(
                    "managed client could not be created: {}",
                    e.message()
                )));
            }
            Err(_) => {
                return Err(GatewayError::configuration(format!(
                    "managed client was not ready within {}ms",
                    connect_timeout.as_millis()
                )));
            }
        };
        tracing::info!(service_url = %service_url, "Managed client ready");

        let direct = match config.direct_connection_string.as_deref() {
            None => {
                tracing::info!("No direct connection configured; schema introspection runs in degraded mode");
                None
            }
            Some(conn) => {
                let target = redact_connection_string(conn);
                match tokio::time::timeout(connect_timeout, connector.connect_direct(conn)).await {
                    Ok(Ok(handle)) => {
                        tracing::info!(target = %target, "Direct connection established");
                        Some(handle)
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(
                            target = %target,
                            error = %e,
                            "Direct connection unavailable; falling back to the managed client for schema"
                        );
                        None
                    }
                    Err(_) => {
                        tracing::warn!(
                            target = %target,
                            timeout_ms = connect_timeout.as_millis() as u64,
                            "Direct connection timed out; falling back to the managed client for schema"
                        );
                        None
                    }
                }
            }
        };

        Ok(Self {
            config,
            direct,
            managed,
        })
    }

    /// Build a manager from already-open handles.
    pub fn from_parts(
        config: ConnectionConfig,
        direct: Option<Arc<dyn DirectBackend>>,
        managed: Arc<dyn ManagedBackend>,
    ) -> Self {
        Self {
            config,
            direct,
            managed,
        }
    }

    /// Re-run initialization with the same configuration.
    pub async fn reconnect(
        &self,
        connector: &dyn BackendConnector,
        connect_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Self::initialize(self.config.clone(), connector, connect_timeout).await
    }

    pub fn state(&self) -> BackendState {
        BackendState {
            direct_available: self.direct.is_some(),
            managed_available: true,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The direct connection, or a connection error when it is unavailable.
    pub fn direct_handle(&self) -> Result<Arc<dyn DirectBackend>, GatewayError> {
        self.direct
            .clone()
            .ok_or_else(|| GatewayError::connection("direct database connection is not available"))
    }

    pub fn managed_handle(&self) -> Arc<dyn ManagedBackend> {
        self.managed.clone()
    }
}
