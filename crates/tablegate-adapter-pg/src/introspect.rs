//! Catalog queries against `information_schema`.
//!
//! Every catalog column is cast to a plain SQL type in the query so decoding
//! does not depend on the information_schema domain types.

use crate::map_sqlx_error;
use sqlx::{PgPool, Row};
use tablegate_core::{ColumnDescriptor, ForeignKeyRef, GatewayError, TableDescriptor};

const LIST_TABLES_SQL: &str = r#"
    select table_name::text as table_name
    from information_schema.tables
    where table_schema = $1
      and table_type in ('BASE TABLE', 'VIEW')
    order by table_name
"#;

// Columns, primary key membership and outgoing foreign keys in one pass.
// A column that belongs to several foreign keys appears once per key.
const DESCRIBE_TABLE_SQL: &str = r#"
    select
      c.column_name::text as column_name,
      case when c.data_type in ('USER-DEFINED', 'ARRAY') then c.udt_name::text
           else c.data_type::text end as data_type,
      (c.is_nullable = 'YES') as nullable,
      c.column_default::text as column_default,
      c.ordinal_position::int4 as ordinal,
      (pk.column_name is not null) as is_primary_key,
      fk.constraint_name as fk_constraint,
      fk.foreign_table_name,
      fk.foreign_column_name
    from information_schema.columns c
    left join (
      select kcu.column_name::text as column_name
      from information_schema.table_constraints tc
      join information_schema.key_column_usage kcu
        on tc.constraint_name = kcu.constraint_name
       and tc.table_schema = kcu.table_schema
      where tc.constraint_type = 'PRIMARY KEY'
        and tc.table_schema = $1
        and tc.table_name = $2
    ) pk on pk.column_name = c.column_name::text
    left join (
      select
        kcu.column_name::text as column_name,
        tc.constraint_name::text as constraint_name,
        ccu.table_name::text as foreign_table_name,
        ccu.column_name::text as foreign_column_name
      from information_schema.table_constraints tc
      join information_schema.key_column_usage kcu
        on tc.constraint_name = kcu.constraint_name
       and tc.table_schema = kcu.table_schema
      join information_schema.constraint_column_usage ccu
        on ccu.constraint_name = tc.constraint_name
       and ccu.table_schema = tc.table_schema
      where tc.constraint_type = 'FOREIGN KEY'
        and tc.table_schema = $1
        and tc.table_name = $2
    ) fk on fk.column_name = c.column_name::text
    where c.table_schema = $1
      and c.table_name = $2
    order by c.ordinal_position, fk.constraint_name
"#;

const RELATIONSHIPS_SQL: &str = r#"
    select
      tc.table_name::text as table_name,
      kcu.column_name::text as column_name,
      tc.constraint_name::text as constraint_name,
      ccu.table_name::text as foreign_table_name,
      ccu.column_name::text as foreign_column_name
    from information_schema.table_constraints tc
    join information_schema.key_column_usage kcu
      on tc.constraint_name = kcu.constraint_name
     and tc.table_schema = kcu.table_schema
    join information_schema.constraint_column_usage ccu
      on ccu.constraint_name = tc.constraint_name
     and ccu.table_schema = tc.table_schema
    where tc.constraint_type = 'FOREIGN KEY'
      and tc.table_schema = $1
      and ($2::text is null or tc.table_name = $2)
    order by tc.table_name, kcu.column_name
"#;

/// One row of the describe query.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnRow {
    pub column_name: String,
    pub data_type: String,
    pub nullable: bool,
    pub column_default: Option<String>,
    pub ordinal: i32,
    pub is_primary_key: bool,
    pub fk_constraint: Option<String>,
    pub foreign_table_name: Option<String>,
    pub foreign_column_name: Option<String>,
}

pub(crate) async fn list_tables(pool: &PgPool, schema: &str) -> Result<Vec<String>, GatewayError> {
    let rows = sqlx::query(LIST_TABLES_SQL)
        .bind(schema)
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_error)?;

    rows.iter()
        .map(|r| r.try_get::<String, _>("table_name").map_err(map_sqlx_error))
        .collect()
}

pub(crate) async fn describe_table(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<TableDescriptor, GatewayError> {
    let rows = sqlx::query(DESCRIBE_TABLE_SQL)
        .bind(schema)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_error)?;

    let column_rows = rows
        .iter()
        .map(|r| {
            Ok(ColumnRow {
                column_name: r.try_get("column_name")?,
                data_type: r.try_get("data_type")?,
                nullable: r.try_get("nullable")?,
                column_default: r.try_get("column_default")?,
                ordinal: r.try_get("ordinal")?,
                is_primary_key: r.try_get("is_primary_key")?,
                fk_constraint: r.try_get("fk_constraint")?,
                foreign_table_name: r.try_get("foreign_table_name")?,
                foreign_column_name: r.try_get("foreign_column_name")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()
        .map_err(map_sqlx_error)?;

    build_descriptor(table, column_rows)
}

pub(crate) async fn get_relationships(
    pool: &PgPool,
    schema: &str,
    table: Option<&str>,
) -> Result<Vec<ForeignKeyRef>, GatewayError> {
    let rows = sqlx::query(RELATIONSHIPS_SQL)
        .bind(schema)
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(map_sqlx_error)?;

    rows.iter()
        .map(|r| {
            Ok(ForeignKeyRef {
                table: r.try_get("table_name")?,
                column: r.try_get("column_name")?,
                referenced_table: r.try_get("foreign_table_name")?,
                referenced_column: r.try_get("foreign_column_name")?,
                constraint_name: r.try_get("constraint_name")?,
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()
        .map_err(map_sqlx_error)
}

/// Fold describe rows into a descriptor. No rows means the table does not exist.
pub(crate) fn build_descriptor(
    table: &str,
    rows: Vec<ColumnRow>,
) -> Result<TableDescriptor, GatewayError> {
    if rows.is_empty() {
        return Err(GatewayError::not_found(format!(
            "table '{}' not found or has no columns",
            table
        )));
    }

    let mut descriptor = TableDescriptor::new(table);
    for row in rows {
        if descriptor.column(&row.column_name).is_none() {
            descriptor.columns.push(ColumnDescriptor {
                name: row.column_name.clone(),
                data_type: row.data_type,
                nullable: row.nullable,
                default: row.column_default,
                ordinal: u32::try_from(row.ordinal).unwrap_or_default(),
            });
        }
        if row.is_primary_key {
            descriptor.primary_key.insert(row.column_name.clone());
        }
        if let (Some(foreign_table), Some(foreign_column)) =
            (row.foreign_table_name, row.foreign_column_name)
        {
            descriptor.foreign_keys.push(ForeignKeyRef {
                table: table.to_string(),
                column: row.column_name,
                referenced_table: foreign_table,
                referenced_column: foreign_column,
                constraint_name: row.fk_constraint,
            });
        }
    }
    descriptor
        .foreign_keys
        .sort_by(|a, b| a.column.cmp(&b.column).then(a.constraint_name.cmp(&b.constraint_name)));

    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, data_type: &str, ordinal: i32) -> ColumnRow {
        ColumnRow {
            column_name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
            column_default: None,
            ordinal,
            is_primary_key: false,
            fk_constraint: None,
            foreign_table_name: None,
            foreign_column_name: None,
        }
    }

    #[test]
    fn test_build_descriptor_collects_keys() {
        let mut id = row("id", "bigint", 1);
        id.nullable = false;
        id.is_primary_key = true;
        id.column_default = Some("nextval('posts_id_seq'::regclass)".into());

        let mut author = row("author_id", "bigint", 2);
        author.fk_constraint = Some("posts_author_id_fkey".into());
        author.foreign_table_name = Some("users".into());
        author.foreign_column_name = Some("id".into());

        let descriptor =
            build_descriptor("posts", vec![id, author, row("title", "text", 3)]).unwrap();

        assert_eq!(descriptor.columns.len(), 3);
        assert_eq!(descriptor.columns[0].ordinal, 1);
        assert!(!descriptor.columns[0].nullable);
        assert!(descriptor.is_primary_key("id"));
        assert_eq!(descriptor.foreign_keys.len(), 1);
        assert_eq!(descriptor.foreign_keys[0].table, "posts");
        assert_eq!(descriptor.foreign_keys[0].referenced_table, "users");
    }

    #[test]
    fn test_column_in_two_foreign_keys_listed_once() {
        let mut a = row("org_id", "uuid", 1);
        a.fk_constraint = Some("fk_a".into());
        a.foreign_table_name = Some("orgs".into());
        a.foreign_column_name = Some("id".into());
        let mut b = a.clone();
        b.fk_constraint = Some("fk_b".into());
        b.foreign_table_name = Some("tenants".into());

        let descriptor = build_descriptor("members", vec![a, b]).unwrap();
        assert_eq!(descriptor.columns.len(), 1);
        assert_eq!(descriptor.foreign_keys.len(), 2);
    }

    #[test]
    fn test_no_rows_is_not_found() {
        let err = build_descriptor("ghost", vec![]).unwrap_err();
        assert_eq!(err.kind(), tablegate_core::ErrorKind::NotFoundError);
    }
}
