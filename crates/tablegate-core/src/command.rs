//! Command request and result types.
//!
//! A [`CommandRequest`] is the table-agnostic argument object for one of the
//! eight gateway operations. Every operation answers with a [`CommandResult`];
//! failures travel in-band so the calling agent loop keeps running.

use crate::error::{ErrorInfo, GatewayError};
use crate::schema::{BackendSource, TableDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single record: column name to JSON value.
pub type Record = Map<String, Value>;

/// Equality filters, column to value. Ordered so generated queries are stable.
pub type Filters = BTreeMap<String, Value>;

/// The gateway operations, named as they are exposed to agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    QueryDb,
    InsertDb,
    UpdateDb,
    DeleteDb,
    ListDbTables,
    DescribeDbTable,
    GetDbRelationships,
    ExecuteDbQuery,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Operation::QueryDb,
        Operation::InsertDb,
        Operation::UpdateDb,
        Operation::DeleteDb,
        Operation::ListDbTables,
        Operation::DescribeDbTable,
        Operation::GetDbRelationships,
        Operation::ExecuteDbQuery,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::QueryDb => "query_db",
            Self::InsertDb => "insert_db",
            Self::UpdateDb => "update_db",
            Self::DeleteDb => "delete_db",
            Self::ListDbTables => "list_db_tables",
            Self::DescribeDbTable => "describe_db_table",
            Self::GetDbRelationships => "get_db_relationships",
            Self::ExecuteDbQuery => "execute_db_query",
        }
    }

    /// Whether the operation answers from schema metadata.
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            Self::ListDbTables | Self::DescribeDbTable | Self::GetDbRelationships
        )
    }

    /// Whether the operation can change data.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::InsertDb | Self::UpdateDb | Self::DeleteDb)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| GatewayError::validation(format!("unknown operation '{}'", s)))
    }
}

/// Sort direction for `query_db`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    /// Parse `column`, `column.asc` or `column.desc`.
    pub fn parse(spec: &str) -> Result<Self, GatewayError> {
        let spec = spec.trim();
        let (column, descending) = match spec.rsplit_once('.') {
            Some((col, dir)) if dir.eq_ignore_ascii_case("asc") => (col, false),
            Some((col, dir)) if dir.eq_ignore_ascii_case("desc") => (col, true),
            Some(_) => {
                return Err(GatewayError::validation(format!(
                    "invalid order '{}': expected column, column.asc or column.desc",
                    spec
                )));
            }
            None => (spec, false),
        };
        if column.is_empty() {
            return Err(GatewayError::validation("order column must not be empty"));
        }
        Ok(Self {
            column: column.to_string(),
            descending,
        })
    }
}

/// Argument object of a gateway command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub operation: Operation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Projection, e.g. `"id, name"`. `None` selects every column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,

    #[serde(default)]
    pub filters: Filters,

    /// Records to insert, or the single assignment record of an update.
    #[serde(default)]
    pub values: Vec<Record>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderBy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_sql: Option<String>,
}

impl CommandRequest {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            table: None,
            select: None,
            filters: Filters::new(),
            values: Vec::new(),
            order: None,
            limit: None,
            offset: None,
            raw_sql: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_select(mut self, select: impl Into<String>) -> Self {
        self.select = Some(select.into());
        self
    }

    pub fn with_filter(mut self, column: impl Into<String>, value: Value) -> Self {
        self.filters.insert(column.into(), value);
        self
    }

    pub fn with_values(mut self, record: Record) -> Self {
        self.values.push(record);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_raw_sql(mut self, sql: impl Into<String>) -> Self {
        self.raw_sql = Some(sql.into());
        self
    }

    /// Build a request from the JSON argument object of a tool call.
    ///
    /// Accepts `data` as an alias of `values` and `query`/`sql` as aliases of
    /// `raw_sql`. Shape errors are reported as validation errors; semantic
    /// checks (required fields, empty filters) are left to the router.
    pub fn from_arguments(operation: Operation, arguments: Value) -> Result<Self, GatewayError> {
        let arguments = match arguments {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        let raw: RawArguments = serde_json::from_value(arguments).map_err(|e| {
            GatewayError::validation(format!("invalid arguments for {}: {}", operation, e))
        })?;

        let values = match raw.values {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(record)) => vec![record],
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(record) => Ok(record),
                    other => Err(GatewayError::validation(format!(
                        "values entries must be objects, got {}",
                        json_type_name(&other)
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => {
                return Err(GatewayError::validation(format!(
                    "values must be an object or an array of objects, got {}",
                    json_type_name(&other)
                )));
            }
        };

        let order = raw.order.as_deref().map(OrderBy::parse).transpose()?;

        Ok(Self {
            operation,
            table: raw.table,
            select: raw.select,
            filters: raw.filters.unwrap_or_default(),
            values,
            order,
            limit: raw.limit,
            offset: raw.offset,
            raw_sql: raw.raw_sql,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawArguments {
    #[serde(default)]
    table: Option<String>,
    #[serde(default)]
    select: Option<String>,
    #[serde(default)]
    filters: Option<Filters>,
    #[serde(default, alias = "data")]
    values: Option<Value>,
    #[serde(default)]
    order: Option<String>,
    #[serde(default)]
    limit: Option<u64>,
    #[serde(default)]
    offset: Option<u64>,
    #[serde(default, alias = "query", alias = "sql")]
    raw_sql: Option<String>,
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Backend provenance of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub source: BackendSource,
    /// Schema information is less complete than the direct path provides.
    pub degraded: bool,
}

impl ResultMetadata {
    pub fn new(source: BackendSource, degraded: bool) -> Self {
        Self { source, degraded }
    }
}

/// Uniform result of every gateway command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Value>>,

    /// Table description returned by `describe_db_table`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<TableDescriptor>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResultMetadata>,
}

impl CommandResult {
    /// Successful result carrying rows.
    pub fn rows(rows: Vec<Value>) -> Self {
        Self {
            success: true,
            rows: Some(rows),
            descriptor: None,
            error: None,
            metadata: None,
        }
    }

    /// Successful result carrying a table description.
    pub fn descriptor(descriptor: TableDescriptor) -> Self {
        Self {
            success: true,
            rows: None,
            descriptor: Some(descriptor),
            error: None,
            metadata: None,
        }
    }

    /// Failed result.
    pub fn failure(error: impl Into<ErrorInfo>) -> Self {
        Self {
            success: false,
            rows: None,
            descriptor: None,
            error: Some(error.into()),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: ResultMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.metadata.is_some_and(|m| m.degraded)
    }

    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_operation_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(op.name().parse::<Operation>().unwrap(), op);
        }
        assert!("drop_db".parse::<Operation>().is_err());
    }

    #[test]
    fn test_order_parse() {
        assert_eq!(
            OrderBy::parse("created_at.desc").unwrap(),
            OrderBy {
                column: "created_at".into(),
                descending: true
            }
        );
        assert!(!OrderBy::parse("name").unwrap().descending);
        assert!(!OrderBy::parse("name.ASC").unwrap().descending);
        assert!(OrderBy::parse("name.sideways").is_err());
        assert!(OrderBy::parse(".desc").is_err());
    }

    #[test]
    fn test_from_arguments_query() {
        let req = CommandRequest::from_arguments(
            Operation::QueryDb,
            json!({
                "table": "users",
                "select": "id, name",
                "filters": {"is_active": true},
                "order": "name.asc",
                "limit": 10
            }),
        )
        .unwrap();

        assert_eq!(req.table.as_deref(), Some("users"));
        assert_eq!(req.filters.get("is_active"), Some(&json!(true)));
        assert_eq!(req.limit, Some(10));
        assert_eq!(req.order.unwrap().column, "name");
    }

    #[test]
    fn test_from_arguments_values_shapes() {
        let single = CommandRequest::from_arguments(
            Operation::InsertDb,
            json!({"table": "tasks", "data": {"title": "a"}}),
        )
        .unwrap();
        assert_eq!(single.values.len(), 1);

        let many = CommandRequest::from_arguments(
            Operation::InsertDb,
            json!({"table": "tasks", "values": [{"title": "a"}, {"title": "b"}]}),
        )
        .unwrap();
        assert_eq!(many.values.len(), 2);

        let err = CommandRequest::from_arguments(
            Operation::InsertDb,
            json!({"table": "tasks", "values": [1, 2]}),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_from_arguments_rejects_negative_limit_and_unknown_fields() {
        let err = CommandRequest::from_arguments(
            Operation::QueryDb,
            json!({"table": "users", "limit": -1}),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let err = CommandRequest::from_arguments(
            Operation::QueryDb,
            json!({"table": "users", "where": "1=1"}),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }

    #[test]
    fn test_from_arguments_null_is_empty() {
        let req = CommandRequest::from_arguments(Operation::ListDbTables, Value::Null).unwrap();
        assert!(req.table.is_none());
        assert!(req.filters.is_empty());
    }

    #[test]
    fn test_raw_sql_alias() {
        let req = CommandRequest::from_arguments(
            Operation::ExecuteDbQuery,
            json!({"query": "SELECT 1"}),
        )
        .unwrap();
        assert_eq!(req.raw_sql.as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn test_result_serialization_skips_empty_fields() {
        let result = CommandResult::rows(vec![json!({"id": 1})])
            .with_metadata(ResultMetadata::new(BackendSource::Managed, false));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], json!(true));
        assert_eq!(value["metadata"]["source"], json!("managed"));
        assert!(value.get("error").is_none());
        assert!(value.get("descriptor").is_none());
    }
}
