//! DDL generation for table definitions.
//!
//! Generates `CREATE TABLE` and `DROP TABLE` statements. Names coming from a
//! [`TableDefinition`] are validated identifiers; names read back from the
//! engine (used when rebuilding an original table) are only quoted. Both go
//! through [`quote_identifier`].
//!
//! # Column types
//!
//! Each column is declared with its storage class name, except
//! [`ColumnType::Null`](table_schema_core::ColumnType::Null), which is
//! declared without a type so that SQLite reports an empty declared type on
//! introspection.

use table_schema_core::{TableDefinition, validate_identifier};

use crate::error::Result;
use crate::introspect::LiveSchemaSnapshot;

/// Quotes an identifier for inclusion in statement text, doubling any
/// embedded double quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Joins identifiers as a quoted, comma-separated list.
pub(crate) fn quoted_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| quote_identifier(n.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generates the `CREATE TABLE` statement for a table definition.
///
/// Columns appear in declaration order. A `PRIMARY KEY (...)` clause is
/// appended when the definition has primary keys.
///
/// # Examples
///
/// ```
/// use table_schema_core::{ColumnType, TableDefinition};
/// use table_schema_sqlite::create_table_sql;
///
/// let table = TableDefinition::builder("players")
///     .column("uuid", ColumnType::Integer)
///     .column("name", ColumnType::Text)
///     .primary_key("uuid")
///     .build()
///     .unwrap();
///
/// assert_eq!(
///     create_table_sql(&table, true),
///     r#"CREATE TABLE IF NOT EXISTS "players" ("uuid" INTEGER, "name" TEXT, PRIMARY KEY ("uuid"));"#
/// );
/// ```
pub fn create_table_sql(table: &TableDefinition, if_not_exists: bool) -> String {
    let columns: Vec<(&str, &str)> = table
        .columns()
        .iter()
        .map(|c| (c.name.as_str(), c.column_type.declared_type()))
        .collect();
    render_create(table.name(), &columns, table.primary_keys(), if_not_exists)
}

/// Generates the `CREATE TABLE` statement that reproduces a live table as
/// it was introspected: same column order, declared types and primary key.
pub(crate) fn create_table_sql_from_snapshot(table: &str, snapshot: &LiveSchemaSnapshot) -> String {
    let columns: Vec<(&str, &str)> = snapshot
        .columns()
        .iter()
        .map(|c| (c.name.as_str(), c.declared_type.as_str()))
        .collect();
    render_create(table, &columns, snapshot.primary_keys(), false)
}

/// Generates the idempotent `DROP TABLE IF EXISTS` statement.
///
/// # Errors
///
/// Returns [`SqliteError::ValidationError`](crate::SqliteError::ValidationError)
/// if `table` is not a valid identifier.
pub fn drop_table_sql(table: &str) -> Result<String> {
    validate_identifier(table)?;
    Ok(format!("DROP TABLE IF EXISTS {};", quote_identifier(table)))
}

fn render_create(
    table: &str,
    columns: &[(&str, &str)],
    primary_keys: &[String],
    if_not_exists: bool,
) -> String {
    let mut parts: Vec<String> = columns
        .iter()
        .map(|(name, declared)| {
            if declared.is_empty() {
                quote_identifier(name)
            } else {
                format!("{} {declared}", quote_identifier(name))
            }
        })
        .collect();

    if !primary_keys.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", quoted_list(primary_keys)));
    }

    format!(
        "CREATE TABLE {}{} ({});",
        if if_not_exists { "IF NOT EXISTS " } else { "" },
        quote_identifier(table),
        parts.join(", ")
    )
}
