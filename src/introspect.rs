//! Schema introspection.
//!
//! Catalog queries that enumerate tables and their columns, built as free
//! functions over the [`Connection`] contract so they run against any
//! adapter. A missing table raises `NotFound`; the variant that returns an
//! empty schema instead is deliberately not supported.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{DriverError, Result};
use crate::metadata;
use crate::traits::Connection;
use crate::types::{Schema, SqlValue};

/// Namespace used when the caller passes an empty one.
pub const DEFAULT_SCHEMA: &str = "public";

const LIST_TABLES: &str =
    "SELECT table_name FROM information_schema.tables WHERE table_schema = ?";

const CLASSIFY_TABLE: &str = "SELECT table_type FROM information_schema.tables \
     WHERE table_schema = ? AND table_name = ?";

const LIST_COLUMNS: &str = "SELECT column_name, data_type, is_nullable \
     FROM information_schema.columns \
     WHERE table_schema = ? AND table_name = ? \
     ORDER BY ordinal_position";

/// Describes every table in the namespace, in the catalog's enumeration
/// order. An empty namespace falls back to [`DEFAULT_SCHEMA`].
pub async fn list_schema<C>(conn: &C, schema: &str) -> Result<Vec<Schema>>
where
    C: Connection + ?Sized,
{
    let schema = resolve_schema(schema);
    let tables = conn
        .execute(LIST_TABLES, &[SqlValue::from(schema)])
        .await?;

    let mut schemas = Vec::with_capacity(tables.len());
    for row in &tables.rows {
        if let Some(Some(table)) = row.first() {
            schemas.push(describe_table(conn, table, schema).await?);
        }
    }
    Ok(schemas)
}

/// Describes one table or view: name, native type and nullability per
/// column, in the catalog's ordinal order. An empty namespace falls back to
/// [`DEFAULT_SCHEMA`].
pub async fn describe_table<C>(conn: &C, table: &str, schema: &str) -> Result<Schema>
where
    C: Connection + ?Sized,
{
    let schema = resolve_schema(schema);
    let binds = [SqlValue::from(schema), SqlValue::from(table)];

    let classified = conn.execute(CLASSIFY_TABLE, &binds).await?;
    let Some(kind) = classified.rows.first().and_then(|r| r.first()) else {
        return Err(DriverError::NotFound(format!("{schema}.{table}")));
    };
    debug!(table, schema, kind = kind.as_deref(), "describing table");

    let raw = conn.execute(LIST_COLUMNS, &binds).await?;
    let descriptors = raw.rows.iter().filter_map(|row| match row.as_slice() {
        [Some(name), Some(native), nullable] => Some((
            name.clone(),
            native.clone(),
            nullable.as_deref() == Some("YES"),
        )),
        _ => None,
    });
    let columns = metadata::map_columns(descriptors, &HashMap::new());

    Ok(Schema::new(vec![table.to_string()], columns))
}

fn resolve_schema(schema: &str) -> &str {
    if schema.is_empty() {
        DEFAULT_SCHEMA
    } else {
        schema
    }
}
