//! Opens the real backends: sqlx Postgres for the direct connection and the
//! REST client for the managed service.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tablegate_adapter_pg::PostgresBackend;
use tablegate_adapter_rest::RestClient;
use tablegate_core::{GatewayError, PoolConfig};
use tablegate_runtime::{BackendConnector, DirectBackend, ManagedBackend};

pub struct LiveConnector {
    pool: PoolConfig,
    managed_timeout: Duration,
}

impl LiveConnector {
    pub fn new(pool: PoolConfig, managed_timeout: Duration) -> Self {
        Self {
            pool,
            managed_timeout,
        }
    }
}

#[async_trait]
impl BackendConnector for LiveConnector {
    async fn connect_direct(
        &self,
        connection_string: &str,
    ) -> Result<Arc<dyn DirectBackend>, GatewayError> {
        let backend = PostgresBackend::connect(connection_string, &self.pool).await?;
        Ok(Arc::new(backend))
    }

    async fn connect_managed(
        &self,
        service_url: &str,
        service_key: &str,
    ) -> Result<Arc<dyn ManagedBackend>, GatewayError> {
        let client = RestClient::new(service_url, service_key, self.managed_timeout)?;
        Ok(Arc::new(client))
    }
}
