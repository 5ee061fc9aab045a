//! Query-string encoding for the REST row API.
//!
//! Filters are equality only: `column=eq.value`, with `is.null` for JSON null.

use serde_json::Value;
use tablegate_core::{Filters, OrderBy};
use tablegate_runtime::SelectQuery;

pub(crate) type Params = Vec<(String, String)>;

/// Encode one filter value as a PostgREST operator expression.
pub(crate) fn filter_expression(value: &Value) -> String {
    match value {
        Value::Null => "is.null".to_string(),
        Value::String(s) => format!("eq.{}", s),
        Value::Bool(b) => format!("eq.{}", b),
        Value::Number(n) => format!("eq.{}", n),
        other => format!("eq.{}", other),
    }
}

pub(crate) fn filter_params(filters: &Filters) -> Params {
    filters
        .iter()
        .map(|(column, value)| (column.clone(), filter_expression(value)))
        .collect()
}

pub(crate) fn order_param(order: &OrderBy) -> (String, String) {
    let direction = if order.descending { "desc" } else { "asc" };
    ("order".to_string(), format!("{}.{}", order.column, direction))
}

/// Normalize a projection: trims blanks around each column, `*` when empty.
pub(crate) fn projection(select: Option<&str>) -> String {
    let columns: Vec<&str> = select
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if columns.is_empty() {
        "*".to_string()
    } else {
        columns.join(",")
    }
}

pub(crate) fn select_params(query: &SelectQuery) -> Params {
    let mut params = vec![("select".to_string(), projection(query.select.as_deref()))];
    params.extend(filter_params(&query.filters));
    if let Some(order) = &query.order {
        params.push(order_param(order));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    if let Some(offset) = query.offset {
        params.push(("offset".to_string(), offset.to_string()));
    }
    params
}
