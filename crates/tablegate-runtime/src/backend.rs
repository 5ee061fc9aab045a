use async_trait::async_trait;
use std::sync::Arc;
use tablegate_core::{
    BackendSource, Filters, ForeignKeyRef, GatewayError, OrderBy, Record, TableDescriptor,
};

/// Schema introspection capability shared by both backends.
///
/// The introspector treats implementations as an ordered list and tries
/// them in turn, so an implementation only has to answer from its own
/// metadata surface and report `Unsupported` for what it cannot see.
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    /// Which backend this is.
    fn source(&self) -> BackendSource;

    /// Table names, ordered by name.
    async fn list_tables(&self) -> Result<Vec<String>, GatewayError>;

    /// Columns, keys and foreign keys of one table.
    async fn describe_table(&self, table: &str) -> Result<TableDescriptor, GatewayError>;

    /// Foreign keys declared on `table`, or on every table when `None`.
    async fn get_relationships(
        &self,
        table: Option<&str>,
    ) -> Result<Vec<ForeignKeyRef>, GatewayError>;
}

/// A row selection against one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub table: String,
    /// Comma separated projection; `None` selects every column.
    pub select: Option<String>,
    pub filters: Filters,
    pub order: Option<OrderBy>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }
}

/// Row-level data operations of the managed client.
#[async_trait]
pub trait DataClient: Send + Sync {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>, GatewayError>;

    /// Insert records; returns the stored rows when the backend returns them.
    async fn insert(&self, table: &str, records: &[Record]) -> Result<Vec<Record>, GatewayError>;

    /// Update rows matching every filter; returns the updated rows.
    async fn update(
        &self,
        table: &str,
        filters: &Filters,
        values: &Record,
    ) -> Result<Vec<Record>, GatewayError>;

    /// Delete rows matching every filter; returns the deleted rows.
    async fn delete(&self, table: &str, filters: &Filters) -> Result<Vec<Record>, GatewayError>;
}

/// Unparameterized statement execution over the direct connection.
#[async_trait]
pub trait RawQueryExecutor: Send + Sync {
    async fn execute_raw(&self, sql: &str) -> Result<Vec<Record>, GatewayError>;
}

/// The direct connection: introspection plus raw statements.
pub trait DirectBackend: SchemaBackend + RawQueryExecutor {
    fn as_schema_backend(&self) -> &dyn SchemaBackend;
}

impl<T: SchemaBackend + RawQueryExecutor> DirectBackend for T {
    fn as_schema_backend(&self) -> &dyn SchemaBackend {
        self
    }
}

/// The managed client: row operations plus reduced-fidelity introspection.
pub trait ManagedBackend: SchemaBackend + DataClient {
    fn as_schema_backend(&self) -> &dyn SchemaBackend;
    fn as_data_client(&self) -> &dyn DataClient;
}

impl<T: SchemaBackend + DataClient> ManagedBackend for T {
    fn as_schema_backend(&self) -> &dyn SchemaBackend {
        self
    }

    fn as_data_client(&self) -> &dyn DataClient {
        self
    }
}

/// Opens backend handles from configuration values.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    async fn connect_direct(
        &self,
        connection_string: &str,
    ) -> Result<Arc<dyn DirectBackend>, GatewayError>;

    async fn connect_managed(
        &self,
        service_url: &str,
        service_key: &str,
    ) -> Result<Arc<dyn ManagedBackend>, GatewayError>;
}
