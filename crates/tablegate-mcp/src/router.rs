//! Command router.
//!
//! Validates a [`CommandRequest`] and dispatches it: row operations go to the
//! managed client, schema operations to the [`SchemaIntrospector`], raw SQL to
//! the direct connection. Every outcome, including validation failures and
//! timeouts, is returned as a [`CommandResult`].

use crate::validator::RequestValidator;
use serde_json::{Value, json};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tablegate_core::{
    BackendSource, CommandRequest, CommandResult, Filters, GatewayError, Operation, Record,
    ResultMetadata, TimeoutConfig,
};
use tablegate_runtime::{ConnectionManager, SchemaIntrospector, SelectQuery};

/// Dispatches gateway commands.
pub struct CommandRouter {
    introspector: Arc<SchemaIntrospector>,
    validator: RequestValidator,
    timeouts: TimeoutConfig,
}

impl CommandRouter {
    pub fn new(introspector: Arc<SchemaIntrospector>, timeouts: TimeoutConfig) -> Self {
        Self {
            introspector,
            validator: RequestValidator::new(),
            timeouts,
        }
    }

    pub fn introspector(&self) -> &Arc<SchemaIntrospector> {
        &self.introspector
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        self.introspector.connections()
    }

    /// Validate and execute a command. Never fails: errors are in-band.
    pub async fn dispatch(&self, request: CommandRequest) -> CommandResult {
        let operation = request.operation;
        tracing::debug!(
            operation = %operation,
            table = request.table.as_deref().unwrap_or("-"),
            "Dispatching command"
        );

        match self.execute(request).await {
            Ok(result) => {
                tracing::debug!(
                    operation = %operation,
                    rows = result.row_count(),
                    degraded = result.is_degraded(),
                    "Command succeeded"
                );
                result
            }
            Err(error) => {
                tracing::warn!(operation = %operation, error = %error, "Command failed");
                CommandResult::failure(error)
            }
        }
    }

    async fn execute(&self, request: CommandRequest) -> Result<CommandResult, GatewayError> {
        self.validator.validate(&request)?;

        match request.operation {
            Operation::QueryDb => {
                let query = SelectQuery {
                    table: table_of(&request)?.to_string(),
                    select: request.select.clone(),
                    filters: request.filters.clone(),
                    order: request.order.clone(),
                    limit: request.limit,
                    offset: request.offset,
                };
                let managed = self.connections().managed_handle();
                let rows = self
                    .managed_call("query_db", managed.as_data_client().select(&query))
                    .await?;
                Ok(managed_rows(rows))
            }
            Operation::InsertDb => {
                let managed = self.connections().managed_handle();
                let rows = self
                    .managed_call(
                        "insert_db",
                        managed
                            .as_data_client()
                            .insert(table_of(&request)?, &request.values),
                    )
                    .await?;
                Ok(managed_rows(rows))
            }
            Operation::UpdateDb => {
                let values = request
                    .values
                    .first()
                    .ok_or_else(|| GatewayError::validation("update_db requires values"))?;
                let managed = self.connections().managed_handle();
                let rows = self
                    .managed_call(
                        "update_db",
                        managed
                            .as_data_client()
                            .update(table_of(&request)?, &request.filters, values),
                    )
                    .await?;
                Ok(managed_rows(rows))
            }
            Operation::DeleteDb => {
                let managed = self.connections().managed_handle();
                let rows = self
                    .managed_call(
                        "delete_db",
                        managed
                            .as_data_client()
                            .delete(table_of(&request)?, &request.filters),
                    )
                    .await?;
                Ok(managed_rows(rows))
            }
            Operation::ListDbTables => {
                let listed = self.introspector.list_tables().await?;
                let rows = listed
                    .value
                    .iter()
                    .map(|name| json!({ "table_name": name }))
                    .collect();
                Ok(CommandResult::rows(rows).with_metadata(listed.metadata()))
            }
            Operation::DescribeDbTable => {
                let described = self.introspector.describe_table(table_of(&request)?).await?;
                let metadata = described.metadata();
                Ok(CommandResult::descriptor(described.value).with_metadata(metadata))
            }
            Operation::GetDbRelationships => {
                let found = self
                    .introspector
                    .get_relationships(request.table.as_deref())
                    .await?;
                let metadata = found.metadata();
                let rows = found
                    .value
                    .into_iter()
                    .map(|fk| serde_json::to_value(fk).unwrap_or(Value::Null))
                    .collect();
                Ok(CommandResult::rows(rows).with_metadata(metadata))
            }
            Operation::ExecuteDbQuery => {
                let sql = request.raw_sql.as_deref().map(str::trim).unwrap_or_default();
                let direct = self.connections().direct_handle().map_err(|_| {
                    GatewayError::connection(
                        "raw queries need the direct database connection, which is not available",
                    )
                })?;
                let deadline = self.timeouts.direct();
                let rows = with_deadline("execute_db_query", deadline, direct.execute_raw(sql)).await?;
                Ok(into_rows(rows)
                    .with_metadata(ResultMetadata::new(BackendSource::Direct, false)))
            }
        }
    }

    async fn managed_call<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        with_deadline(operation, self.timeouts.managed(), fut).await
    }

    // Typed entry points mirroring the command surface.

    pub async fn query_db(
        &self,
        table: &str,
        select: Option<&str>,
        filters: Filters,
        limit: Option<u64>,
    ) -> CommandResult {
        let mut request = CommandRequest::new(Operation::QueryDb).with_table(table);
        request.select = select.map(String::from);
        request.filters = filters;
        request.limit = limit;
        self.dispatch(request).await
    }

    pub async fn insert_db(&self, table: &str, values: Vec<Record>) -> CommandResult {
        let mut request = CommandRequest::new(Operation::InsertDb).with_table(table);
        request.values = values;
        self.dispatch(request).await
    }

    pub async fn update_db(&self, table: &str, filters: Filters, values: Record) -> CommandResult {
        let mut request = CommandRequest::new(Operation::UpdateDb)
            .with_table(table)
            .with_values(values);
        request.filters = filters;
        self.dispatch(request).await
    }

    pub async fn delete_db(&self, table: &str, filters: Filters) -> CommandResult {
        let mut request = CommandRequest::new(Operation::DeleteDb).with_table(table);
        request.filters = filters;
        self.dispatch(request).await
    }

    pub async fn list_db_tables(&self) -> CommandResult {
        self.dispatch(CommandRequest::new(Operation::ListDbTables)).await
    }

    pub async fn describe_db_table(&self, table: &str) -> CommandResult {
        self.dispatch(CommandRequest::new(Operation::DescribeDbTable).with_table(table))
            .await
    }

    pub async fn get_db_relationships(&self, table: Option<&str>) -> CommandResult {
        let mut request = CommandRequest::new(Operation::GetDbRelationships);
        request.table = table.map(String::from);
        self.dispatch(request).await
    }

    pub async fn execute_db_query(&self, raw_sql: &str) -> CommandResult {
        self.dispatch(CommandRequest::new(Operation::ExecuteDbQuery).with_raw_sql(raw_sql))
            .await
    }
}

async fn with_deadline<T>(
    operation: &str,
    deadline: Duration,
    fut: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::timeout(operation, deadline)),
    }
}

fn table_of(request: &CommandRequest) -> Result<&str, GatewayError> {
    request
        .table
        .as_deref()
        .ok_or_else(|| GatewayError::validation(format!("{} requires a table", request.operation)))
}

fn into_rows(records: Vec<Record>) -> CommandResult {
    CommandResult::rows(records.into_iter().map(Value::Object).collect())
}

/// Row results from the managed client carry no schema information.
fn managed_rows(records: Vec<Record>) -> CommandResult {
    into_rows(records).with_metadata(ResultMetadata::new(BackendSource::Managed, false))
}
