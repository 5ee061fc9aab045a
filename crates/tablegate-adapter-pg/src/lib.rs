//! # tablegate-adapter-pg
//!
//! The direct backend: a pooled Postgres connection that reads the catalog
//! (`information_schema`) and runs raw statements.
//!
//! Table names may be schema-qualified (`audit.events`); unqualified names
//! resolve against the `public` schema.

mod introspect;
mod rows;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tablegate_core::{
    BackendSource, ForeignKeyRef, GatewayError, PoolConfig, Record, TableDescriptor,
};
use tablegate_runtime::{RawQueryExecutor, SchemaBackend};

const DEFAULT_SCHEMA: &str = "public";

/// Pooled direct connection.
#[derive(Clone)]
pub struct PostgresBackend {
    pool: PgPool,
    schema: String,
}

impl PostgresBackend {
    /// Open a pool and verify one connection can be acquired.
    pub async fn connect(connection_string: &str, pool: &PoolConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(pool.max_connections)
            .acquire_timeout(Duration::from_secs(pool.acquire_timeout_seconds))
            .connect(connection_string)
            .await
            .map_err(map_sqlx_error)?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema: DEFAULT_SCHEMA.to_string(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Split `schema.table` into its parts, defaulting the schema.
    fn resolve<'a>(&'a self, table: &'a str) -> (&'a str, &'a str) {
        split_qualified(table).unwrap_or((self.schema.as_str(), table))
    }
}

fn split_qualified(table: &str) -> Option<(&str, &str)> {
    table
        .split_once('.')
        .filter(|(schema, name)| !schema.is_empty() && !name.is_empty())
}

#[async_trait]
impl SchemaBackend for PostgresBackend {
    fn source(&self) -> BackendSource {
        BackendSource::Direct
    }

    async fn list_tables(&self) -> Result<Vec<String>, GatewayError> {
        introspect::list_tables(&self.pool, &self.schema).await
    }

    async fn describe_table(&self, table: &str) -> Result<TableDescriptor, GatewayError> {
        let (schema, name) = self.resolve(table);
        let mut descriptor = introspect::describe_table(&self.pool, schema, name).await?;
        descriptor.name = table.to_string();
        Ok(descriptor)
    }

    async fn get_relationships(
        &self,
        table: Option<&str>,
    ) -> Result<Vec<ForeignKeyRef>, GatewayError> {
        match table {
            Some(table) => {
                let (schema, name) = self.resolve(table);
                introspect::get_relationships(&self.pool, schema, Some(name)).await
            }
            None => introspect::get_relationships(&self.pool, &self.schema, None).await,
        }
    }
}

#[async_trait]
impl RawQueryExecutor for PostgresBackend {
    async fn execute_raw(&self, sql: &str) -> Result<Vec<Record>, GatewayError> {
        if returns_rows(sql) {
            let rows = sqlx::query(sql)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            tracing::debug!(rows = rows.len(), "Raw query returned rows");
            Ok(rows.iter().map(rows::row_to_record).collect())
        } else {
            let result = sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            let mut record = Record::new();
            record.insert(
                "rows_affected".to_string(),
                serde_json::Value::from(result.rows_affected()),
            );
            Ok(vec![record])
        }
    }
}

/// Whether a statement produces a result set.
pub(crate) fn returns_rows(sql: &str) -> bool {
    let upper = sql.trim_start().to_ascii_uppercase();
    let leading = upper
        .split(|c: char| c.is_whitespace() || c == '(')
        .find(|w| !w.is_empty())
        .unwrap_or_default();

    matches!(
        leading,
        "SELECT" | "WITH" | "VALUES" | "TABLE" | "SHOW" | "EXPLAIN"
    ) || upper.contains("RETURNING")
}

/// Map driver errors onto the gateway taxonomy.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> GatewayError {
    match err {
        sqlx::Error::PoolTimedOut => GatewayError::connection("timed out acquiring a pooled connection"),
        sqlx::Error::PoolClosed => GatewayError::connection("connection pool is closed"),
        sqlx::Error::Io(e) => GatewayError::connection(format!("I/O error: {}", e)),
        sqlx::Error::Tls(e) => GatewayError::connection(format!("TLS error: {}", e)),
        sqlx::Error::Configuration(e) => {
            GatewayError::configuration(format!("invalid connection string: {}", e))
        }
        sqlx::Error::RowNotFound => GatewayError::not_found("no rows returned"),
        sqlx::Error::Database(db) => GatewayError::backend(db.message().to_string()),
        other => GatewayError::backend(other.to_string()),
    }
}
