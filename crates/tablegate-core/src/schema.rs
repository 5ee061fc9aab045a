//! Schema descriptors produced by introspection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Which backend served an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendSource {
    /// Raw database connection.
    Direct,
    /// Managed-service client.
    Managed,
}

impl fmt::Display for BackendSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Managed => f.write_str("managed"),
        }
    }
}

/// Description of a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Table name.
    pub name: String,

    /// Columns in ordinal order.
    pub columns: Vec<ColumnDescriptor>,

    /// Primary key column names.
    #[serde(default)]
    pub primary_key: BTreeSet<String>,

    /// Outgoing foreign keys, ordered by column.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyRef>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: BTreeSet::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key.contains(column)
    }

    /// Foreign key declared on `column`, if any.
    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKeyRef> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }
}

/// Description of a table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,

    /// SQL data type, or the closest type the backend can report.
    pub data_type: String,

    pub nullable: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    /// 1-based position within the table.
    #[serde(default)]
    pub ordinal: u32,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            ordinal: 0,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn at(mut self, ordinal: u32) -> Self {
        self.ordinal = ordinal;
        self
    }
}

/// A foreign key column and the column it references.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referencing table.
    pub table: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_name: Option<String>,
}

impl ForeignKeyRef {
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
            constraint_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup_helpers() {
        let mut table = TableDescriptor::new("posts");
        table
            .columns
            .push(ColumnDescriptor::new("id", "integer").not_null().at(1));
        table
            .columns
            .push(ColumnDescriptor::new("author_id", "integer").at(2));
        table.primary_key.insert("id".to_string());
        table
            .foreign_keys
            .push(ForeignKeyRef::new("posts", "author_id", "users", "id"));

        assert!(table.is_primary_key("id"));
        assert!(!table.is_primary_key("author_id"));
        assert!(!table.column("id").unwrap().nullable);
        assert_eq!(
            table.foreign_key_for("author_id").unwrap().referenced_table,
            "users"
        );
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn test_source_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(BackendSource::Managed).unwrap(),
            serde_json::json!("managed")
        );
    }
}
