//! Request validation for gateway commands.
//!
//! Every check here runs BEFORE any backend is contacted:
//! - **Required fields** per operation
//! - **Identifiers**: table, column and projection names
//! - **Scoping**: update and delete need at least one filter
//! - **Raw SQL guard**: a keyword denylist for destructive statements
//!
//! The raw SQL guard is keyword based. Comments, string literals and
//! obfuscated spellings are not interpreted, so it is a safety net for
//! well-meaning agents and not an access-control boundary.

use regex::Regex;
use tablegate_core::{CommandRequest, Filters, GatewayError, Operation, Record};

// =============================================================================
// RAW SQL GUARD
// =============================================================================

/// A statement pattern rejected by the raw SQL guard.
struct DenyRule {
    pattern: Regex,
    /// When set, the statement is allowed if this pattern matches after the hit.
    unless_followed_by: Option<Regex>,
    reason: &'static str,
}

/// Keyword denylist for `execute_db_query`.
pub struct SqlGuard {
    rules: Vec<DenyRule>,
}

impl Default for SqlGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlGuard {
    pub fn new() -> Self {
        let where_clause = || Some(word(r"WHERE"));
        Self {
            rules: vec![
                DenyRule {
                    pattern: word(r"DROP"),
                    unless_followed_by: None,
                    reason: "DROP statements are not allowed",
                },
                DenyRule {
                    pattern: word(r"TRUNCATE"),
                    unless_followed_by: None,
                    reason: "TRUNCATE statements are not allowed",
                },
                DenyRule {
                    pattern: word(r"ALTER"),
                    unless_followed_by: None,
                    reason: "ALTER statements are not allowed",
                },
                DenyRule {
                    pattern: word(r"DELETE\s+FROM"),
                    unless_followed_by: where_clause(),
                    reason: "DELETE without a WHERE clause is not allowed",
                },
                DenyRule {
                    pattern: word(r"UPDATE\s+\S+\s+SET"),
                    unless_followed_by: where_clause(),
                    reason: "UPDATE without a WHERE clause is not allowed",
                },
            ],
        }
    }

    /// Reject denylisted statements with a validation error.
    pub fn check(&self, sql: &str) -> Result<(), GatewayError> {
        for rule in &self.rules {
            let Some(hit) = rule.pattern.find(sql) else {
                continue;
            };
            let scoped = rule
                .unless_followed_by
                .as_ref()
                .is_some_and(|re| re.is_match(&sql[hit.end()..]));
            if !scoped {
                tracing::warn!(reason = rule.reason, "Rejected raw SQL statement");
                return Err(GatewayError::validation(format!(
                    "potentially destructive SQL rejected: {}",
                    rule.reason
                )));
            }
        }
        Ok(())
    }
}

/// Case-insensitive, word-bounded pattern.
fn word(body: &str) -> Regex {
    Regex::new(&format!(r"(?is)\b{}\b", body)).expect("denylist patterns are valid")
}

// =============================================================================
// REQUEST VALIDATOR
// =============================================================================

/// Validates a [`CommandRequest`] for its operation.
#[derive(Default)]
pub struct RequestValidator {
    guard: SqlGuard,
}

impl RequestValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(&self) -> &SqlGuard {
        &self.guard
    }

    /// Validate a request before dispatch.
    pub fn validate(&self, request: &CommandRequest) -> Result<(), GatewayError> {
        match request.operation {
            Operation::QueryDb => self.validate_query(request),
            Operation::InsertDb => self.validate_insert(request),
            Operation::UpdateDb => self.validate_update(request),
            Operation::DeleteDb => self.validate_delete(request),
            Operation::ListDbTables => Ok(()),
            Operation::DescribeDbTable => required_table(request).map(|_| ()),
            Operation::GetDbRelationships => match request.table.as_deref() {
                Some(table) => validate_table_name(table),
                None => Ok(()),
            },
            Operation::ExecuteDbQuery => self.validate_raw(request),
        }
    }

    fn validate_query(&self, request: &CommandRequest) -> Result<(), GatewayError> {
        required_table(request)?;
        if let Some(select) = request.select.as_deref() {
            validate_projection(select)?;
        }
        validate_filter_columns(&request.filters)?;
        if let Some(order) = &request.order {
            validate_column_name(&order.column)?;
        }
        if request.limit == Some(0) {
            return Err(GatewayError::validation("limit must be greater than zero"));
        }
        Ok(())
    }

    fn validate_insert(&self, request: &CommandRequest) -> Result<(), GatewayError> {
        required_table(request)?;
        if request.values.is_empty() {
            return Err(GatewayError::validation(
                "insert_db requires values: an object or an array of objects",
            ));
        }
        for record in &request.values {
            validate_record(record)?;
        }
        Ok(())
    }

    fn validate_update(&self, request: &CommandRequest) -> Result<(), GatewayError> {
        required_table(request)?;
        required_filters(request)?;
        match request.values.as_slice() {
            [record] => validate_record(record),
            [] => Err(GatewayError::validation("update_db requires values")),
            _ => Err(GatewayError::validation(
                "update_db takes a single values object",
            )),
        }
    }

    fn validate_delete(&self, request: &CommandRequest) -> Result<(), GatewayError> {
        required_table(request)?;
        required_filters(request)
    }

    fn validate_raw(&self, request: &CommandRequest) -> Result<(), GatewayError> {
        let sql = request
            .raw_sql
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GatewayError::validation("execute_db_query requires raw_sql"))?;
        self.guard.check(sql)
    }
}

// =============================================================================
// FIELD CHECKS
// =============================================================================

fn required_table(request: &CommandRequest) -> Result<&str, GatewayError> {
    let table = request
        .table
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            GatewayError::validation(format!("{} requires a table", request.operation))
        })?;
    validate_table_name(table)?;
    Ok(table)
}

fn required_filters(request: &CommandRequest) -> Result<(), GatewayError> {
    if request.filters.is_empty() {
        return Err(GatewayError::validation(format!(
            "{} requires at least one filter; unscoped changes to every row are not allowed",
            request.operation
        )));
    }
    validate_filter_columns(&request.filters)
}

fn validate_filter_columns(filters: &Filters) -> Result<(), GatewayError> {
    filters.keys().try_for_each(|c| validate_column_name(c))
}

fn validate_record(record: &Record) -> Result<(), GatewayError> {
    if record.is_empty() {
        return Err(GatewayError::validation("values objects must not be empty"));
    }
    record.keys().try_for_each(|c| validate_column_name(c))
}

/// `*` or a comma separated list of column names.
fn validate_projection(select: &str) -> Result<(), GatewayError> {
    let columns: Vec<&str> = select.split(',').map(str::trim).collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(GatewayError::validation("select must name at least one column"));
    }
    for column in columns {
        if column != "*" {
            validate_column_name(column)?;
        }
    }
    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A plain identifier, optionally qualified as `schema.table`.
pub fn validate_table_name(table: &str) -> Result<(), GatewayError> {
    let valid = match table.split_once('.') {
        Some((schema, name)) => is_identifier(schema) && is_identifier(name),
        None => is_identifier(table),
    };
    if valid {
        Ok(())
    } else {
        Err(GatewayError::validation(format!(
            "invalid table name '{}'",
            table
        )))
    }
}

pub fn validate_column_name(column: &str) -> Result<(), GatewayError> {
    if is_identifier(column) {
        Ok(())
    } else {
        Err(GatewayError::validation(format!(
            "invalid column name '{}'",
            column
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tablegate_core::ErrorKind;

    fn validator() -> RequestValidator {
        RequestValidator::new()
    }

    fn kind(result: Result<(), GatewayError>) -> Option<ErrorKind> {
        result.err().map(|e| e.kind())
    }

    #[test]
    fn test_guard_rejects_destructive_keywords() {
        let guard = SqlGuard::new();
        assert!(guard.check("DROP TABLE users").is_err());
        assert!(guard.check("drop table users").is_err());
        assert!(guard.check("truncate audit_log").is_err());
        assert!(guard.check("ALTER TABLE users ADD COLUMN x int").is_err());
        assert!(guard.check("SELECT 1; DROP TABLE users").is_err());
    }

    #[test]
    fn test_guard_requires_where_for_delete_and_update() {
        let guard = SqlGuard::new();
        assert!(guard.check("DELETE FROM sessions").is_err());
        assert!(guard.check("DELETE FROM sessions WHERE expired").is_ok());
        assert!(guard.check("UPDATE users SET active = false").is_err());
        assert!(guard.check("update users set active = false where id = 7").is_ok());
    }

    #[test]
    fn test_guard_allows_reads() {
        let guard = SqlGuard::new();
        assert!(guard.check("SELECT * FROM users LIMIT 1").is_ok());
        assert!(guard.check("SELECT dropped_at, altered FROM events").is_ok());
        assert!(guard.check("SELECT * FROM jobs FOR UPDATE").is_ok());
    }

    #[test]
    fn test_update_and_delete_need_filters() {
        let update = CommandRequest::new(Operation::UpdateDb)
            .with_table("users")
            .with_values(json!({"name": "x"}).as_object().unwrap().clone());
        assert_eq!(kind(validator().validate(&update)), Some(ErrorKind::ValidationError));

        let delete = CommandRequest::new(Operation::DeleteDb).with_table("users");
        assert_eq!(kind(validator().validate(&delete)), Some(ErrorKind::ValidationError));

        let scoped = delete.with_filter("id", json!(1));
        assert!(validator().validate(&scoped).is_ok());
    }

    #[test]
    fn test_update_takes_one_record() {
        let record = json!({"name": "x"}).as_object().unwrap().clone();
        let request = CommandRequest::new(Operation::UpdateDb)
            .with_table("users")
            .with_filter("id", json!(1))
            .with_values(record.clone())
            .with_values(record);
        assert!(validator().validate(&request).is_err());
    }

    #[test]
    fn test_insert_rejects_empty_records() {
        let request = CommandRequest::new(Operation::InsertDb)
            .with_table("users")
            .with_values(Record::new());
        assert!(validator().validate(&request).is_err());

        let missing = CommandRequest::new(Operation::InsertDb).with_table("users");
        assert!(validator().validate(&missing).is_err());
    }

    #[test]
    fn test_query_checks() {
        let ok = CommandRequest::new(Operation::QueryDb)
            .with_table("public.users")
            .with_select("id, name")
            .with_limit(10);
        assert!(validator().validate(&ok).is_ok());

        let no_table = CommandRequest::new(Operation::QueryDb);
        assert!(validator().validate(&no_table).is_err());

        let zero = CommandRequest::new(Operation::QueryDb).with_table("users").with_limit(0);
        assert!(validator().validate(&zero).is_err());

        let injected = CommandRequest::new(Operation::QueryDb).with_table("users; drop");
        assert!(validator().validate(&injected).is_err());

        let bad_select = CommandRequest::new(Operation::QueryDb)
            .with_table("users")
            .with_select("id, name)");
        assert!(validator().validate(&bad_select).is_err());
    }

    #[test]
    fn test_raw_sql_required() {
        let request = CommandRequest::new(Operation::ExecuteDbQuery).with_raw_sql("   ");
        assert!(validator().validate(&request).is_err());
    }

    #[test]
    fn test_identifiers() {
        assert!(validate_table_name("users").is_ok());
        assert!(validate_table_name("_audit.events_2024").is_ok());
        assert!(validate_table_name("a.b.c").is_err());
        assert!(validate_table_name("1users").is_err());
        assert!(validate_column_name("first name").is_err());
    }
}
