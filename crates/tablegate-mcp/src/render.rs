//! Agent-readable text rendering of command results.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;
use tablegate_core::{
    ColumnDescriptor, CommandResult, ForeignKeyRef, Operation, TableDescriptor,
};

const DEGRADED_NOTE: &str =
    "Note: schema served by the managed service; foreign keys and exact types may be incomplete.";

/// Render a command result as text for the calling agent.
pub fn render_result(operation: Operation, result: &CommandResult) -> String {
    if let Some(error) = &result.error {
        return format!("Error ({}): {}", error.kind, error.message);
    }

    let mut text = match operation {
        Operation::ListDbTables => render_table_list(result.rows.as_deref().unwrap_or_default()),
        Operation::DescribeDbTable => match &result.descriptor {
            Some(descriptor) => render_table(descriptor),
            None => String::from("No table description returned."),
        },
        Operation::GetDbRelationships => {
            let refs: Vec<ForeignKeyRef> = result
                .rows
                .iter()
                .flatten()
                .filter_map(|row| serde_json::from_value(row.clone()).ok())
                .collect();
            render_relationships(&refs)
        }
        _ => render_rows(operation, result.rows.as_deref().unwrap_or_default()),
    };

    if result.is_degraded() {
        text.push_str("\n\n");
        text.push_str(DEGRADED_NOTE);
    }
    text
}

fn render_table_list(rows: &[Value]) -> String {
    let names: Vec<&str> = rows
        .iter()
        .filter_map(|row| row.get("table_name").and_then(Value::as_str))
        .collect();
    if names.is_empty() {
        return String::from("No tables found.");
    }

    let mut text = String::from("Tables in database:\n");
    for name in names {
        let _ = writeln!(text, "- {}", name);
    }
    text.trim_end().to_string()
}

/// `column: type NULL|NOT NULL[ DEFAULT x]`
pub fn render_column(column: &ColumnDescriptor) -> String {
    let nullable = if column.nullable { "NULL" } else { "NOT NULL" };
    match &column.default {
        Some(default) => format!("{}: {} {} DEFAULT {}", column.name, column.data_type, nullable, default),
        None => format!("{}: {} {}", column.name, column.data_type, nullable),
    }
}

/// One table block: columns, primary key and outgoing foreign keys.
pub fn render_table(table: &TableDescriptor) -> String {
    let mut text = format!("Table: {}\nColumns:\n", table.name);
    for column in &table.columns {
        let _ = writeln!(text, "  - {}", render_column(column));
    }
    if !table.primary_key.is_empty() {
        let keys: Vec<&str> = table.primary_key.iter().map(String::as_str).collect();
        let _ = writeln!(text, "Primary key: {}", keys.join(", "));
    }
    if !table.foreign_keys.is_empty() {
        text.push_str("Relationships:\n");
        for fk in &table.foreign_keys {
            let _ = writeln!(
                text,
                "  - {} → {}.{}",
                fk.column, fk.referenced_table, fk.referenced_column
            );
        }
    }
    text.trim_end().to_string()
}

fn render_relationships(refs: &[ForeignKeyRef]) -> String {
    if refs.is_empty() {
        return String::from("No foreign key relationships found.");
    }

    let mut by_table: BTreeMap<&str, Vec<&ForeignKeyRef>> = BTreeMap::new();
    for fk in refs {
        by_table.entry(fk.table.as_str()).or_default().push(fk);
    }

    let mut text = String::new();
    for (table, fks) in by_table {
        let _ = writeln!(text, "Table: {}", table);
        for fk in fks {
            let _ = writeln!(
                text,
                "  - {} → {}.{}",
                fk.column, fk.referenced_table, fk.referenced_column
            );
        }
    }
    text.trim_end().to_string()
}

fn render_rows(operation: Operation, rows: &[Value]) -> String {
    let summary = match operation {
        Operation::InsertDb => format!("Inserted {} row(s).", rows.len()),
        Operation::UpdateDb => format!("Updated {} row(s).", rows.len()),
        Operation::DeleteDb => format!("Deleted {} row(s).", rows.len()),
        _ => format!("{} row(s) returned.", rows.len()),
    };
    if rows.is_empty() {
        return summary;
    }
    let body = serde_json::to_string_pretty(rows).unwrap_or_default();
    format!("{}\n{}", summary, body)
}

/// Full schema listing for prompt context.
pub fn render_schema_summary(tables: &[TableDescriptor], omitted: usize) -> String {
    let mut text = String::from("DATABASE SCHEMA INFORMATION:\n\n");
    for table in tables {
        text.push_str(&render_table(table));
        text.push_str("\n\n");
    }
    if omitted > 0 {
        let _ = writeln!(text, "({} more table(s) not shown)", omitted);
    }
    text.trim_end().to_string()
}
