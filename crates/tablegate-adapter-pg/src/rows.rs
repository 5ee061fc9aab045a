//! Row to JSON conversion for arbitrary result sets.

use bigdecimal::BigDecimal;
use serde_json::{Value, json};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};
use tablegate_core::Record;

/// Convert a row into a JSON object keyed by column name.
pub(crate) fn row_to_record(row: &PgRow) -> Record {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_info().name());
        record.insert(column.name().to_string(), value);
    }
    record
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Value {
    let decoded = match type_name {
        "BOOL" => opt(row.try_get::<Option<bool>, _>(idx)),
        "INT2" => opt(row.try_get::<Option<i16>, _>(idx)),
        "INT4" => opt(row.try_get::<Option<i32>, _>(idx)),
        "INT8" => opt(row.try_get::<Option<i64>, _>(idx)),
        "FLOAT4" => opt(row.try_get::<Option<f32>, _>(idx)),
        "FLOAT8" => opt(row.try_get::<Option<f64>, _>(idx)),
        "NUMERIC" => row
            .try_get::<Option<BigDecimal>, _>(idx)
            .ok()
            .map(|v| v.map(|d| numeric_to_json(&d)).unwrap_or(Value::Null)),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx).ok().map(Option::unwrap_or_default),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)
            .ok()
            .map(|v| v.map(|u| json!(u.to_string())).unwrap_or(Value::Null)),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .ok()
            .map(|v| v.map(|t| json!(t.to_rfc3339())).unwrap_or(Value::Null)),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
            .ok()
            .map(|v| v.map(|t| json!(t.to_string())).unwrap_or(Value::Null)),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)
            .ok()
            .map(|v| v.map(|d| json!(d.to_string())).unwrap_or(Value::Null)),
        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(idx)
            .ok()
            .map(|v| v.map(|t| json!(t.to_string())).unwrap_or(Value::Null)),
        "TEXT[]" | "VARCHAR[]" => row
            .try_get::<Option<Vec<String>>, _>(idx)
            .ok()
            .map(|v| v.map(|items| json!(items)).unwrap_or(Value::Null)),
        "INT4[]" => row
            .try_get::<Option<Vec<i32>>, _>(idx)
            .ok()
            .map(|v| v.map(|items| json!(items)).unwrap_or(Value::Null)),
        "INT8[]" => row
            .try_get::<Option<Vec<i64>>, _>(idx)
            .ok()
            .map(|v| v.map(|items| json!(items)).unwrap_or(Value::Null)),
        _ => None,
    };

    // Text-like and unrecognized types fall back to a string decode.
    decoded.unwrap_or_else(|| match row.try_get::<Option<String>, _>(idx) {
        Ok(Some(s)) => json!(s),
        Ok(None) => Value::Null,
        Err(_) => {
            tracing::debug!(column = idx, r#type = %type_name, "Unsupported column type; returning null");
            Value::Null
        }
    })
}

fn opt<T: Into<Value>>(decoded: Result<Option<T>, sqlx::Error>) -> Option<Value> {
    decoded
        .ok()
        .map(|v| v.map(Into::into).unwrap_or(Value::Null))
}

/// Numerics become JSON numbers when they round-trip through `f64` text, strings otherwise.
pub(crate) fn numeric_to_json(value: &BigDecimal) -> Value {
    let text = value.normalized().to_string();
    if let Ok(int) = text.parse::<i64>() {
        return json!(int);
    }
    match text.parse::<f64>() {
        Ok(float) if float.is_finite() && float.to_string() == text => json!(float),
        _ => json!(text),
    }
}
