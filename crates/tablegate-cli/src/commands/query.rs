//! Row commands: `query` and `sql`.

use super::{Gateway, print_result};
use anyhow::{Context, Result};
use serde_json::Value;
use std::process::ExitCode;
use tablegate_core::{CommandRequest, Operation, OrderBy};

/// Options of `tablegate query`.
#[derive(Debug, Default)]
pub struct QueryOptions {
    pub select: Option<String>,
    pub filters: Vec<String>,
    pub order: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub async fn query(gateway: &Gateway, table: &str, options: QueryOptions) -> Result<ExitCode> {
    let mut request = CommandRequest::new(Operation::QueryDb).with_table(table);
    request.select = options.select;
    for filter in &options.filters {
        let (column, value) = parse_filter(filter)?;
        request = request.with_filter(column, value);
    }
    request.order = options.order.as_deref().map(OrderBy::parse).transpose()?;
    request.limit = options.limit;
    request.offset = options.offset;

    print_result(&gateway.router.dispatch(request).await)
}

pub async fn sql(gateway: &Gateway, statement: &str) -> Result<ExitCode> {
    print_result(&gateway.router.execute_db_query(statement).await)
}

/// `column=value`; the value is read as JSON when it parses, else as text.
fn parse_filter(raw: &str) -> Result<(String, Value)> {
    let (column, value) = raw
        .split_once('=')
        .with_context(|| format!("filter '{}' must look like column=value", raw))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((column.trim().to_string(), value))
}
