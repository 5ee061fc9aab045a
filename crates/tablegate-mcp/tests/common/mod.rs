//! In-memory backends for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tablegate_core::{
    BackendSource, ColumnDescriptor, ConnectionConfig, ContextConfig, Filters, ForeignKeyRef,
    GatewayError, Record, TableDescriptor, TimeoutConfig,
};
use tablegate_mcp::{CommandRouter, ContextInjector};
use tablegate_runtime::{
    BackendConnector, ConnectionManager, DataClient, DirectBackend, ManagedBackend,
    RawQueryExecutor, SchemaBackend, SchemaIntrospector, SelectQuery,
};

pub fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}

pub fn filters(value: Value) -> Filters {
    value
        .as_object()
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default()
}

pub fn test_timeouts() -> TimeoutConfig {
    TimeoutConfig {
        direct_ms: 150,
        managed_ms: 150,
        connect_ms: 150,
    }
}

fn users_table() -> TableDescriptor {
    let mut users = TableDescriptor::new("users");
    users.columns = vec![
        ColumnDescriptor::new("id", "bigint").not_null().at(1),
        ColumnDescriptor::new("name", "text").not_null().at(2),
        ColumnDescriptor::new("email", "character varying").at(3),
        ColumnDescriptor::new("is_active", "boolean")
            .not_null()
            .with_default("true")
            .at(4),
        ColumnDescriptor::new("org_id", "uuid").at(5),
    ];
    users.primary_key.insert("id".into());
    users
        .foreign_keys
        .push(ForeignKeyRef::new("users", "org_id", "orgs", "id"));
    users
}

fn orgs_table() -> TableDescriptor {
    let mut orgs = TableDescriptor::new("orgs");
    orgs.columns = vec![
        ColumnDescriptor::new("id", "uuid").not_null().at(1),
        ColumnDescriptor::new("name", "text").not_null().at(2),
    ];
    orgs.primary_key.insert("id".into());
    orgs
}

// =============================================================================
// DIRECT
// =============================================================================

/// How the fake direct connection answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectMode {
    Healthy,
    /// Every call fails with a connection error.
    Failing,
    /// Every call outlives the direct deadline.
    Hanging,
}

/// Direct connection with full metadata, including foreign keys.
pub struct FakeDirect {
    mode: Mutex<DirectMode>,
    pub calls: AtomicUsize,
    pub raw_statements: Mutex<Vec<String>>,
}

impl FakeDirect {
    pub fn new() -> Self {
        Self {
            mode: Mutex::new(DirectMode::Healthy),
            calls: AtomicUsize::new(0),
            raw_statements: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: DirectMode) {
        *self.mode.lock().unwrap() = mode;
    }

    async fn enter(&self) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.lock().unwrap();
        match mode {
            DirectMode::Healthy => Ok(()),
            DirectMode::Failing => Err(GatewayError::connection("connection reset by peer")),
            DirectMode::Hanging => {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl SchemaBackend for FakeDirect {
    fn source(&self) -> BackendSource {
        BackendSource::Direct
    }

    async fn list_tables(&self) -> Result<Vec<String>, GatewayError> {
        self.enter().await?;
        Ok(vec!["orgs".into(), "users".into()])
    }

    async fn describe_table(&self, table: &str) -> Result<TableDescriptor, GatewayError> {
        self.enter().await?;
        match table {
            "users" => Ok(users_table()),
            "orgs" => Ok(orgs_table()),
            other => Err(GatewayError::not_found(format!("table '{}' does not exist", other))),
        }
    }

    async fn get_relationships(
        &self,
        table: Option<&str>,
    ) -> Result<Vec<ForeignKeyRef>, GatewayError> {
        self.enter().await?;
        Ok(users_table()
            .foreign_keys
            .into_iter()
            .filter(|fk| table.is_none_or(|t| t == fk.table))
            .collect())
    }
}

#[async_trait]
impl RawQueryExecutor for FakeDirect {
    async fn execute_raw(&self, sql: &str) -> Result<Vec<Record>, GatewayError> {
        self.enter().await?;
        self.raw_statements.lock().unwrap().push(sql.to_string());
        Ok(vec![record(json!({"result": 1}))])
    }
}

// =============================================================================
// MANAGED
// =============================================================================

/// Managed client over an in-memory table store.
///
/// Its metadata surface reports generic types and no foreign keys.
pub struct FakeManaged {
    tables: Mutex<BTreeMap<String, Vec<Record>>>,
    pub calls: AtomicUsize,
    pub list_fails: AtomicBool,
}

impl FakeManaged {
    /// Seeded with five users, three of them active.
    pub fn seeded() -> Self {
        let users = vec![
            record(json!({"id": 1, "name": "Ada", "email": "ada@example.com", "is_active": true})),
            record(json!({"id": 2, "name": "Grace", "email": "grace@example.com", "is_active": true})),
            record(json!({"id": 3, "name": "Linus", "email": null, "is_active": false})),
            record(json!({"id": 4, "name": "Barbara", "email": "barbara@example.com", "is_active": true})),
            record(json!({"id": 5, "name": "Ken", "email": "ken@example.com", "is_active": false})),
        ];
        let mut tables = BTreeMap::new();
        tables.insert("users".to_string(), users);
        tables.insert("orgs".to_string(), Vec::new());
        Self {
            tables: Mutex::new(tables),
            calls: AtomicUsize::new(0),
            list_fails: AtomicBool::new(false),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn matches(row: &Record, filters: &Filters) -> bool {
        filters
            .iter()
            .all(|(column, value)| row.get(column).unwrap_or(&Value::Null) == value)
    }
}

#[async_trait]
impl SchemaBackend for FakeManaged {
    fn source(&self) -> BackendSource {
        BackendSource::Managed
    }

    async fn list_tables(&self) -> Result<Vec<String>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(GatewayError::backend("openapi root unavailable"));
        }
        Ok(self.tables.lock().unwrap().keys().cloned().collect())
    }

    async fn describe_table(&self, table: &str) -> Result<TableDescriptor, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut descriptor = match table {
            "users" => users_table(),
            "orgs" => orgs_table(),
            other => return Err(GatewayError::not_found(format!("table '{}' not found", other))),
        };
        descriptor.foreign_keys.clear();
        for column in &mut descriptor.columns {
            if column.data_type == "character varying" {
                column.data_type = "string".into();
            }
        }
        Ok(descriptor)
    }

    async fn get_relationships(
        &self,
        _table: Option<&str>,
    ) -> Result<Vec<ForeignKeyRef>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(GatewayError::unsupported("constraints are not exposed"))
    }
}

#[async_trait]
impl DataClient for FakeManaged {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().unwrap();
        let rows = tables
            .get(&query.table)
            .ok_or_else(|| GatewayError::not_found(format!("relation '{}' does not exist", query.table)))?;

        let mut selected: Vec<Record> = rows
            .iter()
            .filter(|row| Self::matches(row, &query.filters))
            .cloned()
            .collect();

        if let Some(order) = &query.order {
            selected.sort_by(|a, b| {
                let key = |r: &Record| r.get(&order.column).map(|v| v.to_string()).unwrap_or_default();
                key(a).cmp(&key(b))
            });
            if order.descending {
                selected.reverse();
            }
        }

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l as usize);
        let columns: Option<Vec<String>> = query
            .select
            .as_deref()
            .map(|s| s.split(',').map(|c| c.trim().to_string()).collect());

        Ok(selected
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| match &columns {
                Some(columns) => row
                    .into_iter()
                    .filter(|(k, _)| columns.contains(k))
                    .collect(),
                None => row,
            })
            .collect())
    }

    async fn insert(&self, table: &str, records: &[Record]) -> Result<Vec<Record>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| GatewayError::not_found(format!("relation '{}' does not exist", table)))?;
        rows.extend(records.iter().cloned());
        Ok(records.to_vec())
    }

    async fn update(
        &self,
        table: &str,
        filters: &Filters,
        values: &Record,
    ) -> Result<Vec<Record>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| GatewayError::not_found(format!("relation '{}' does not exist", table)))?;
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| Self::matches(row, filters)) {
            for (column, value) in values {
                row.insert(column.clone(), value.clone());
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &Filters) -> Result<Vec<Record>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut tables = self.tables.lock().unwrap();
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| GatewayError::not_found(format!("relation '{}' does not exist", table)))?;
        let (deleted, kept): (Vec<Record>, Vec<Record>) =
            rows.drain(..).partition(|row| Self::matches(row, filters));
        *rows = kept;
        Ok(deleted)
    }
}

// =============================================================================
// CONNECTOR
// =============================================================================

/// Hands out the given fakes; the direct side can be made unreachable.
pub struct FakeConnector {
    pub direct: Option<Arc<FakeDirect>>,
    pub managed: Arc<FakeManaged>,
}

#[async_trait]
impl BackendConnector for FakeConnector {
    async fn connect_direct(
        &self,
        _connection_string: &str,
    ) -> Result<Arc<dyn DirectBackend>, GatewayError> {
        match &self.direct {
            Some(direct) => Ok(direct.clone()),
            None => Err(GatewayError::connection("connection refused")),
        }
    }

    async fn connect_managed(
        &self,
        _service_url: &str,
        _service_key: &str,
    ) -> Result<Arc<dyn ManagedBackend>, GatewayError> {
        Ok(self.managed.clone())
    }
}

// =============================================================================
// HARNESS
// =============================================================================

/// A router and context injector over the fakes.
pub struct Gateway {
    pub direct: Option<Arc<FakeDirect>>,
    pub managed: Arc<FakeManaged>,
    pub introspector: Arc<SchemaIntrospector>,
    pub router: Arc<CommandRouter>,
}

impl Gateway {
    pub fn new(with_direct: bool) -> Self {
        let direct = with_direct.then(|| Arc::new(FakeDirect::new()));
        let managed = Arc::new(FakeManaged::seeded());

        let direct_handle: Option<Arc<dyn DirectBackend>> =
            direct.clone().map(|d| d as Arc<dyn DirectBackend>);
        let managed_handle: Arc<dyn ManagedBackend> = managed.clone();
        let connections = Arc::new(ConnectionManager::from_parts(
            ConnectionConfig::default(),
            direct_handle,
            managed_handle,
        ));

        let introspector = Arc::new(SchemaIntrospector::new(connections, test_timeouts()));
        let router = Arc::new(CommandRouter::new(introspector.clone(), test_timeouts()));
        Self {
            direct,
            managed,
            introspector,
            router,
        }
    }

    pub fn direct(&self) -> &FakeDirect {
        self.direct.as_deref().expect("gateway built with a direct connection")
    }

    pub fn context(&self, config: ContextConfig) -> ContextInjector {
        ContextInjector::new(self.introspector.clone(), config)
    }
}
