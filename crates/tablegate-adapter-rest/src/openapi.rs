//! Schema introspection from the service's OpenAPI root document.
//!
//! The row API publishes one `definitions` entry per exposed table or view.
//! Each property carries the Postgres type in `format`, a `default` when the
//! column has one, and key markers inside `description`:
//! `<pk/>` for primary key columns and `<fk table='t' column='c'/>` for
//! foreign keys. Nullability comes from the definition's `required` list.
//!
//! Column ordinals follow the document's property order, which is not
//! guaranteed to match the table's physical order.

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tablegate_core::{ColumnDescriptor, ForeignKeyRef, GatewayError, TableDescriptor};

static FK_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<fk table=['"]([^'"]+)['"] column=['"]([^'"]+)['"]\s*/>"#)
        .expect("foreign key marker pattern is valid")
});

const PK_MARKER: &str = "<pk/>";

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenApiDocument {
    #[serde(default)]
    definitions: BTreeMap<String, Definition>,
    #[serde(default)]
    paths: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Definition {
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    properties: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Property {
    #[serde(default)]
    format: Option<String>,
    #[serde(rename = "type", default)]
    json_type: Option<String>,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    description: Option<String>,
}

impl OpenApiDocument {
    pub(crate) fn parse(value: Value) -> Result<Self, GatewayError> {
        serde_json::from_value(value)
            .map_err(|e| GatewayError::unsupported(format!("service schema document is not readable: {}", e)))
    }

    /// Table names, from `definitions` or else from non-RPC `paths`.
    pub(crate) fn table_names(&self) -> Result<Vec<String>, GatewayError> {
        let mut names: Vec<String> = if self.definitions.is_empty() {
            self.paths
                .keys()
                .filter_map(|p| p.strip_prefix('/'))
                .filter(|p| !p.is_empty() && !p.starts_with("rpc/"))
                .map(String::from)
                .collect()
        } else {
            self.definitions.keys().cloned().collect()
        };

        if names.is_empty() {
            return Err(GatewayError::unsupported(
                "managed service does not enumerate tables",
            ));
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub(crate) fn describe(&self, table: &str) -> Result<TableDescriptor, GatewayError> {
        let definition = self.definitions.get(table).ok_or_else(|| {
            GatewayError::not_found(format!("table '{}' is not exposed by the managed service", table))
        })?;

        let mut descriptor = TableDescriptor::new(table);
        for (idx, (name, raw)) in definition.properties.iter().enumerate() {
            let property: Property = serde_json::from_value(raw.clone()).unwrap_or_default();
            let description = property.description.as_deref().unwrap_or_default();

            let data_type = property
                .format
                .or(property.json_type)
                .unwrap_or_else(|| "unknown".to_string());

            descriptor.columns.push(ColumnDescriptor {
                name: name.clone(),
                data_type,
                nullable: !definition.required.contains(name),
                default: property.default.map(|v| match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                }),
                ordinal: (idx + 1) as u32,
            });

            if description.contains(PK_MARKER) {
                descriptor.primary_key.insert(name.clone());
            }
            if let Some(caps) = FK_MARKER.captures(description) {
                descriptor.foreign_keys.push(ForeignKeyRef::new(
                    table,
                    name.clone(),
                    caps[1].to_string(),
                    caps[2].to_string(),
                ));
            }
        }

        Ok(descriptor)
    }

    /// Foreign keys declared through description markers.
    pub(crate) fn relationships(&self, table: Option<&str>) -> Result<Vec<ForeignKeyRef>, GatewayError> {
        if self.definitions.is_empty() {
            return Err(GatewayError::unsupported(
                "managed service does not report foreign keys",
            ));
        }

        let tables: Vec<&String> = match table {
            Some(t) => self.definitions.keys().filter(|k| k.as_str() == t).collect(),
            None => self.definitions.keys().collect(),
        };

        let mut refs = Vec::new();
        for name in tables {
            refs.extend(self.describe(name)?.foreign_keys);
        }
        refs.sort_by(|a, b| a.table.cmp(&b.table).then(a.column.cmp(&b.column)));
        Ok(refs)
    }
}
