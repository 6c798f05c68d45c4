//! Live table introspection.
//!
//! Reads the structure of an existing table from the engine catalog. A
//! snapshot is built fresh on every call and never cached, so it always
//! reflects the table as it is at that instant.

use rusqlite::{Connection, params};

use crate::error::Result;

/// One column as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveColumn {
    /// Column name.
    pub name: String,
    /// Declared type, upper-cased. Empty when the column has no type.
    pub declared_type: String,
}

/// Structure of a live table: columns in engine order plus primary keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiveSchemaSnapshot {
    columns: Vec<LiveColumn>,
    primary_keys: Vec<String>,
}

impl LiveSchemaSnapshot {
    #[cfg(test)]
    pub(crate) fn from_parts(columns: Vec<LiveColumn>, primary_keys: Vec<String>) -> Self {
        Self {
            columns,
            primary_keys,
        }
    }

    /// Columns in the order the engine reports them.
    pub fn columns(&self) -> &[LiveColumn] {
        &self.columns
    }

    /// Primary-key columns in key order.
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// Looks up a column by name, ignoring ASCII case as the engine does.
    pub fn column(&self, name: &str) -> Option<&LiveColumn> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Returns `true` if the table has a column called `name`.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

/// Returns `true` if a table called `table` exists in the main schema.
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let mut stmt = conn.prepare(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
    )?;
    let count: i64 = stmt.query_row(params![table], |row| row.get(0))?;
    Ok(count > 0)
}

/// Reads the live structure of `table`.
///
/// Returns `Ok(None)` when the table does not exist, which keeps "absent"
/// distinct from any snapshot the engine could report.
///
/// # Examples
///
/// ```
/// use rusqlite::Connection;
/// use table_schema_sqlite::introspect;
///
/// let conn = Connection::open_in_memory().unwrap();
/// assert!(introspect(&conn, "players").unwrap().is_none());
///
/// conn.execute_batch("CREATE TABLE players (uuid integer, name TEXT, PRIMARY KEY (uuid));").unwrap();
/// let snapshot = introspect(&conn, "players").unwrap().unwrap();
/// assert_eq!(snapshot.column("uuid").unwrap().declared_type, "INTEGER");
/// assert_eq!(snapshot.primary_keys(), ["uuid".to_string()]);
/// ```
pub fn introspect(conn: &Connection, table: &str) -> Result<Option<LiveSchemaSnapshot>> {
    if !table_exists(conn, table)? {
        return Ok(None);
    }

    let mut stmt = conn.prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")?;
    let rows = stmt
        .query_map(params![table], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut snapshot = LiveSchemaSnapshot::default();
    let mut keyed: Vec<(i64, String)> = Vec::new();
    for (name, declared_type, pk) in rows {
        if pk > 0 {
            keyed.push((pk, name.clone()));
        }
        snapshot.columns.push(LiveColumn {
            name,
            declared_type: declared_type.unwrap_or_default().to_ascii_uppercase(),
        });
    }
    keyed.sort_by_key(|(position, _)| *position);
    snapshot.primary_keys = keyed.into_iter().map(|(_, name)| name).collect();

    Ok(Some(snapshot))
}
