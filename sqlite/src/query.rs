//! Parameterized statement building for CRUD operations.
//!
//! Every builder is a pure function returning a [`Statement`]: SQL text with
//! positional `?` placeholders plus the text values to bind. Table and
//! column names are validated identifiers and are quoted; condition, sort
//! and select-column fragments are validated and spliced in verbatim;
//! values are never spliced, only bound. No numeric or boolean encoding
//! happens here: values are bound as text and any type coercion is left to
//! the column affinity of the engine.
//!
//! # Example
//!
//! ```
//! use table_schema_sqlite::{Record, build_select, build_update};
//!
//! let select = build_select("players", &["uuid", "name"], &["uuid > 3"], &["uuid desc"]).unwrap();
//! assert_eq!(
//!     select.sql(),
//!     r#"SELECT uuid, name FROM "players" WHERE uuid > 3 ORDER BY uuid desc"#
//! );
//!
//! let update = build_update("players", &Record::new().with("name", "Steve"), &["uuid = 3"]).unwrap();
//! assert_eq!(update.sql(), r#"UPDATE "players" SET "name" = ? WHERE uuid = 3"#);
//! assert_eq!(update.params(), ["Steve".to_string()]);
//! ```

use table_schema_core::{validate_fragment, validate_identifier};

use crate::error::{Result, SqliteError};
use crate::schema::{quote_identifier, quoted_list};

/// An ordered set of column → text value pairs.
///
/// Used for inserted rows and for update assignments. Setting a column
/// that is already present replaces its value in place, keeping the
/// original position.
///
/// # Examples
///
/// ```
/// use table_schema_sqlite::Record;
///
/// let row = Record::new()
///     .with("uuid", "1")
///     .with("name", "Test_1")
///     .with("progress", "10");
///
/// assert_eq!(row.columns().collect::<Vec<_>>(), vec!["uuid", "name", "progress"]);
/// assert_eq!(row.get("name"), Some("Test_1"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    entries: Vec<(String, String)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record with `column` set to `value`.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(column, value);
        self
    }

    /// Sets `column` to `value`.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    /// Value of `column`, if set.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Column names in insertion order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    /// `(column, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }

    /// Number of columns set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no column is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.set(column, value);
        }
        record
    }
}

/// Statement text plus the text values bound to its placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    params: Vec<String>,
    unconditioned: bool,
}

impl Statement {
    /// SQL text with positional `?` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Values in placeholder order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Returns `true` for an update or delete without conditions, which
    /// touches every row of the table.
    pub fn is_unconditioned(&self) -> bool {
        self.unconditioned
    }
}

/// Builds a `SELECT`.
///
/// An empty `columns` selects `*`. Conditions are AND-joined (each wrapped
/// in parentheses when there is more than one) and sort fragments are
/// comma-joined as given, so each carries its own direction
/// (`"age desc"`).
///
/// # Errors
///
/// Returns [`SqliteError::ValidationError`] for an invalid table name or
/// fragment.
pub fn build_select(
    table: &str,
    columns: &[&str],
    conditions: &[&str],
    sort: &[&str],
) -> Result<Statement> {
    validate_identifier(table)?;
    let projection = if columns.is_empty() {
        "*".to_string()
    } else {
        join_fragments(columns, ", ")?
    };

    let mut sql = format!("SELECT {projection} FROM {}", quote_identifier(table));
    push_where(&mut sql, conditions)?;
    if !sort.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&join_fragments(sort, ", ")?);
    }

    Ok(Statement {
        sql,
        params: Vec::new(),
        unconditioned: false,
    })
}

/// Builds an `INSERT` of one or more rows.
///
/// The column list comes from the first row; every other row must set
/// exactly the same columns. Values are bound row by row in the first
/// row's column order.
///
/// # Errors
///
/// Returns [`SqliteError::NoData`] when `rows` is empty or the first row
/// sets no column, [`SqliteError::MismatchedColumns`] when a later row sets
/// different columns, and [`SqliteError::ValidationError`] for invalid
/// names.
pub fn build_insert(table: &str, rows: &[Record]) -> Result<Statement> {
    validate_identifier(table)?;
    let first = rows.first().filter(|r| !r.is_empty()).ok_or(SqliteError::NoData)?;
    let columns: Vec<&str> = first.columns().collect();
    for column in &columns {
        validate_identifier(column)?;
    }

    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    let mut params = Vec::with_capacity(rows.len() * columns.len());
    for (index, row) in rows.iter().enumerate() {
        if row.len() != columns.len() {
            return Err(SqliteError::MismatchedColumns { row: index });
        }
        for column in &columns {
            let value = row
                .get(column)
                .ok_or(SqliteError::MismatchedColumns { row: index })?;
            params.push(value.to_string());
        }
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_identifier(table),
        quoted_list(&columns),
        vec![placeholders; rows.len()].join(", ")
    );

    Ok(Statement {
        sql,
        params,
        unconditioned: false,
    })
}

/// Builds an `UPDATE` setting each assignment in order.
///
/// # Errors
///
/// Returns [`SqliteError::NoData`] for an empty assignment set and
/// [`SqliteError::ValidationError`] for invalid names or fragments.
pub fn build_update(table: &str, assignments: &Record, conditions: &[&str]) -> Result<Statement> {
    validate_identifier(table)?;
    if assignments.is_empty() {
        return Err(SqliteError::NoData);
    }

    let mut set_clauses = Vec::with_capacity(assignments.len());
    let mut params = Vec::with_capacity(assignments.len());
    for (column, value) in assignments.iter() {
        validate_identifier(column)?;
        set_clauses.push(format!("{} = ?", quote_identifier(column)));
        params.push(value.to_string());
    }

    let mut sql = format!(
        "UPDATE {} SET {}",
        quote_identifier(table),
        set_clauses.join(", ")
    );
    push_where(&mut sql, conditions)?;

    Ok(Statement {
        sql,
        params,
        unconditioned: conditions.is_empty(),
    })
}

/// Builds a `DELETE`.
///
/// Without conditions the statement deletes every row; it is still built,
/// but flagged through [`Statement::is_unconditioned`].
pub fn build_delete(table: &str, conditions: &[&str]) -> Result<Statement> {
    validate_identifier(table)?;
    let mut sql = format!("DELETE FROM {}", quote_identifier(table));
    push_where(&mut sql, conditions)?;

    Ok(Statement {
        sql,
        params: Vec::new(),
        unconditioned: conditions.is_empty(),
    })
}

fn join_fragments(fragments: &[&str], separator: &str) -> Result<String> {
    for fragment in fragments {
        validate_fragment(fragment)?;
    }
    Ok(fragments.join(separator))
}

fn push_where(sql: &mut String, conditions: &[&str]) -> Result<()> {
    match conditions {
        [] => {}
        [single] => {
            validate_fragment(single)?;
            sql.push_str(" WHERE ");
            sql.push_str(single);
        }
        many => {
            let wrapped: Vec<String> = many
                .iter()
                .map(|c| validate_fragment(c).map(|()| format!("({c})")))
                .collect::<std::result::Result<_, _>>()?;
            sql.push_str(" WHERE ");
            sql.push_str(&wrapped.join(" AND "));
        }
    }
    Ok(())
}
