//! Tool definitions for the gateway commands.
//!
//! Each [`Operation`] is exposed as one tool with a JSON input schema. The
//! registry keeps the tools in command-surface order.

use crate::protocol::{ToolAnnotations, ToolDefinition};
use serde_json::{Value, json};
use tablegate_core::Operation;

/// Registry of available MCP tools.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<(Operation, ToolDefinition)>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// A registry with every gateway command.
    pub fn new() -> Self {
        Self {
            tools: Operation::ALL
                .into_iter()
                .map(|op| (op, definition(op)))
                .collect(),
        }
    }

    /// Resolve a tool name to its operation.
    pub fn operation(&self, name: &str) -> Option<Operation> {
        self.tools
            .iter()
            .find(|(_, tool)| tool.name == name)
            .map(|(op, _)| *op)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools
            .iter()
            .find(|(_, tool)| tool.name == name)
            .map(|(_, tool)| tool)
    }

    pub fn list(&self) -> Vec<&ToolDefinition> {
        self.tools.iter().map(|(_, tool)| tool).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn table_property() -> Value {
    json!({
        "type": "string",
        "description": "Table name, optionally schema-qualified (schema.table)"
    })
}

fn filters_property() -> Value {
    json!({
        "type": "object",
        "description": "Equality filters: column name to value",
        "additionalProperties": true
    })
}

fn definition(operation: Operation) -> ToolDefinition {
    let (description, schema) = match operation {
        Operation::QueryDb => (
            "Query rows from a table with an optional projection, equality filters, ordering and paging.",
            json!({
                "type": "object",
                "properties": {
                    "table": table_property(),
                    "select": {
                        "type": "string",
                        "description": "Comma separated columns, e.g. \"id, name\". Defaults to all columns."
                    },
                    "filters": filters_property(),
                    "order": {
                        "type": "string",
                        "description": "column, column.asc or column.desc"
                    },
                    "limit": { "type": "integer", "minimum": 1 },
                    "offset": { "type": "integer", "minimum": 0 }
                },
                "required": ["table"]
            }),
        ),
        Operation::InsertDb => (
            "Insert one record or an array of records into a table. Returns the stored rows.",
            json!({
                "type": "object",
                "properties": {
                    "table": table_property(),
                    "values": {
                        "oneOf": [
                            { "type": "object" },
                            { "type": "array", "items": { "type": "object" }, "minItems": 1 }
                        ],
                        "description": "Column values of the new record(s)"
                    }
                },
                "required": ["table", "values"]
            }),
        ),
        Operation::UpdateDb => (
            "Update the rows matching the filters. At least one filter is required.",
            json!({
                "type": "object",
                "properties": {
                    "table": table_property(),
                    "filters": filters_property(),
                    "values": { "type": "object", "description": "Columns to set" }
                },
                "required": ["table", "filters", "values"]
            }),
        ),
        Operation::DeleteDb => (
            "Delete the rows matching the filters. At least one filter is required.",
            json!({
                "type": "object",
                "properties": {
                    "table": table_property(),
                    "filters": filters_property()
                },
                "required": ["table", "filters"]
            }),
        ),
        Operation::ListDbTables => (
            "List the tables in the database.",
            json!({ "type": "object", "properties": {} }),
        ),
        Operation::DescribeDbTable => (
            "Describe a table: columns, types, nullability, defaults and keys.",
            json!({
                "type": "object",
                "properties": { "table": table_property() },
                "required": ["table"]
            }),
        ),
        Operation::GetDbRelationships => (
            "List foreign key relationships of one table, or of every table when none is given.",
            json!({
                "type": "object",
                "properties": { "table": table_property() }
            }),
        ),
        Operation::ExecuteDbQuery => (
            "Run a raw SQL statement on the direct database connection. DROP, TRUNCATE, ALTER and unscoped DELETE/UPDATE are rejected.",
            json!({
                "type": "object",
                "properties": {
                    "raw_sql": { "type": "string", "description": "SQL statement" }
                },
                "required": ["raw_sql"]
            }),
        ),
    };

    ToolDefinition {
        name: operation.name().to_string(),
        description: Some(description.to_string()),
        input_schema: schema,
        annotations: Some(ToolAnnotations {
            read_only_hint: Some(!operation.is_mutation() && operation != Operation::ExecuteDbQuery),
            destructive_hint: Some(matches!(
                operation,
                Operation::UpdateDb | Operation::DeleteDb | Operation::ExecuteDbQuery
            )),
        }),
    }
}
