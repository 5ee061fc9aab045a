//! Schema introspection with direct-first fallback.
//!
//! Every operation walks the available backends in order: the direct
//! connection (only when it is available), then the managed client. Any
//! error from the direct path, including a timeout, moves on to the managed
//! client; an error is surfaced only when every backend has failed.

use crate::backend::{DirectBackend, ManagedBackend, SchemaBackend};
use crate::connection::ConnectionManager;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tablegate_core::{
    BackendSource, ForeignKeyRef, GatewayError, ResultMetadata, TableDescriptor, TimeoutConfig,
};

/// A schema answer together with the backend that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Introspected<T> {
    pub value: T,
    pub source: BackendSource,
    pub degraded: bool,
}

impl<T> Introspected<T> {
    fn from_source(value: T, source: BackendSource) -> Self {
        Self {
            value,
            source,
            degraded: source == BackendSource::Managed,
        }
    }

    pub fn metadata(&self) -> ResultMetadata {
        ResultMetadata::new(self.source, self.degraded)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Introspected<U> {
        Introspected {
            value: f(self.value),
            source: self.source,
            degraded: self.degraded,
        }
    }
}

/// Answers "list tables", "describe table" and "get relationships".
pub struct SchemaIntrospector {
    connections: Arc<ConnectionManager>,
    timeouts: TimeoutConfig,
    /// Table names seen by earlier successful calls.
    known_tables: RwLock<BTreeSet<String>>,
}

impl SchemaIntrospector {
    pub fn new(connections: Arc<ConnectionManager>, timeouts: TimeoutConfig) -> Self {
        Self {
            connections,
            timeouts,
            known_tables: RwLock::new(BTreeSet::new()),
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// List table names.
    ///
    /// When no backend can enumerate tables, the names learned from earlier
    /// calls are returned as a degraded answer. With nothing learned yet the
    /// call fails rather than claiming the database is empty.
    pub async fn list_tables(&self) -> Result<Introspected<Vec<String>>, GatewayError> {
        let direct = self.connections.direct_handle().ok();
        let managed = self.connections.managed_handle();
        let mut last_error = None;

        for backend in candidates(&direct, &managed) {
            match self.call(backend, "list_tables", backend.list_tables()).await {
                Ok(tables) => {
                    self.remember(tables.iter().cloned());
                    return Ok(Introspected::from_source(tables, backend.source()));
                }
                Err(e) => last_error = Some(self.log_failure(backend, "list_tables", e)),
            }
        }

        let known: Vec<String> = self.known_table_names();
        if !known.is_empty() {
            tracing::warn!(
                count = known.len(),
                "No backend could enumerate tables; answering from previously seen tables"
            );
            return Ok(Introspected {
                value: known,
                source: BackendSource::Managed,
                degraded: true,
            });
        }

        Err(match last_error {
            Some(e) if e.is_unsupported() => e,
            Some(e) => GatewayError::unsupported(format!(
                "tables cannot be enumerated: {}",
                e.message()
            )),
            None => GatewayError::unsupported("tables cannot be enumerated"),
        })
    }

    /// Describe one table.
    ///
    /// A not-found answer from the direct connection is final; other direct
    /// failures fall back to the managed client.
    pub async fn describe_table(
        &self,
        table: &str,
    ) -> Result<Introspected<TableDescriptor>, GatewayError> {
        let direct = self.connections.direct_handle().ok();
        let managed = self.connections.managed_handle();
        let mut last_error = None;

        for backend in candidates(&direct, &managed) {
            match self
                .call(backend, "describe_table", backend.describe_table(table))
                .await
            {
                Ok(descriptor) => {
                    self.remember(std::iter::once(descriptor.name.clone()));
                    return Ok(Introspected::from_source(descriptor, backend.source()));
                }
                Err(e @ GatewayError::NotFound(_)) if backend.source() == BackendSource::Direct => {
                    return Err(e);
                }
                Err(e) => last_error = Some(self.log_failure(backend, "describe_table", e)),
            }
        }

        Err(self.exhausted("describe_table", last_error))
    }

    /// Foreign keys of one table, or of every table.
    ///
    /// A managed client that cannot report constraints yields an empty,
    /// degraded answer instead of failing the command.
    pub async fn get_relationships(
        &self,
        table: Option<&str>,
    ) -> Result<Introspected<Vec<ForeignKeyRef>>, GatewayError> {
        let direct = self.connections.direct_handle().ok();
        let managed = self.connections.managed_handle();
        let mut last_error = None;

        for backend in candidates(&direct, &managed) {
            match self
                .call(backend, "get_relationships", backend.get_relationships(table))
                .await
            {
                Ok(relationships) => {
                    return Ok(Introspected::from_source(relationships, backend.source()));
                }
                Err(e) if e.is_unsupported() && backend.source() == BackendSource::Managed => {
                    tracing::warn!(
                        table = table.unwrap_or("*"),
                        "Managed client cannot report constraints; returning no relationships"
                    );
                    return Ok(Introspected {
                        value: Vec::new(),
                        source: BackendSource::Managed,
                        degraded: true,
                    });
                }
                Err(e) => last_error = Some(self.log_failure(backend, "get_relationships", e)),
            }
        }

        Err(self.exhausted("get_relationships", last_error))
    }

    /// Tables learned from earlier successful calls, ordered by name.
    pub fn known_table_names(&self) -> Vec<String> {
        match self.known_tables.read() {
            Ok(known) => known.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    fn remember(&self, names: impl IntoIterator<Item = String>) {
        let mut known = match self.known_tables.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        known.extend(names);
    }

    fn deadline(&self, source: BackendSource) -> Duration {
        match source {
            BackendSource::Direct => self.timeouts.direct(),
            BackendSource::Managed => self.timeouts.managed(),
        }
    }

    async fn call<T>(
        &self,
        backend: &dyn SchemaBackend,
        operation: &str,
        fut: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        let deadline = self.deadline(backend.source());
        tracing::debug!(source = %backend.source(), operation, "Introspecting");
        match tokio::time::timeout(deadline, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::timeout(operation, deadline)),
        }
    }

    fn log_failure(
        &self,
        backend: &dyn SchemaBackend,
        operation: &str,
        error: GatewayError,
    ) -> GatewayError {
        match backend.source() {
            BackendSource::Direct => tracing::warn!(
                operation,
                error = %error,
                "Direct introspection failed; falling back to the managed client"
            ),
            BackendSource::Managed => tracing::error!(
                operation,
                error = %error,
                "Managed introspection failed"
            ),
        }
        error
    }

    fn exhausted(&self, operation: &str, last_error: Option<GatewayError>) -> GatewayError {
        last_error.unwrap_or_else(|| {
            GatewayError::connection(format!("no backend available for {}", operation))
        })
    }
}

/// Backends in the order they are tried.
fn candidates<'a>(
    direct: &'a Option<Arc<dyn DirectBackend>>,
    managed: &'a Arc<dyn ManagedBackend>,
) -> impl Iterator<Item = &'a dyn SchemaBackend> {
    direct
        .iter()
        .map(|d| d.as_schema_backend())
        .chain(std::iter::once(managed.as_schema_backend()))
}
