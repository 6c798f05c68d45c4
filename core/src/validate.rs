//! Identifier, fragment and table definition validation.
//!
//! Table and column names are spliced into statement text, so they are
//! restricted to plain identifiers. Condition, sort and select-column
//! fragments are passed through verbatim and therefore only screened for
//! statement terminators and comment markers.
//!
//! # Examples
//!
//! ```
//! use table_schema_core::{validate_fragment, validate_identifier};
//!
//! assert!(validate_identifier("player_stats").is_ok());
//! assert!(validate_identifier("drop;--").is_err());
//!
//! assert!(validate_fragment("age > 18").is_ok());
//! assert!(validate_fragment("1 = 1; DROP TABLE users").is_err());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::TableDefinition;

/// Markers that are never allowed inside a raw fragment.
const FORBIDDEN_FRAGMENT_MARKERS: [&str; 5] = [";", "--", "/*", "*/", "\0"];

/// Definition and statement-input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Identifier is empty or contains characters other than ASCII
    /// alphanumerics and underscores.
    #[error("invalid identifier '{0}': must be non-empty and contain only ASCII alphanumerics and underscores")]
    InvalidIdentifier(String),
    /// Identifier uses the engine's reserved `sqlite_` prefix.
    #[error("identifier '{0}' uses the reserved sqlite_ prefix")]
    ReservedIdentifier(String),
    /// Raw fragment is empty or contains a terminator or comment marker.
    #[error("invalid fragment '{0}'")]
    InvalidFragment(String),
    /// Column type name is not one of NULL, INTEGER, REAL, TEXT, BLOB.
    #[error("unknown column type: {0}")]
    UnknownColumnType(String),
    /// Table has no columns.
    #[error("table '{0}' must define at least one column")]
    NoColumns(String),
    /// Primary key names a column that the table does not define.
    #[error("primary key '{0}' is not a column of the table")]
    UnknownPrimaryKey(String),
    /// Primary key lists the same column twice.
    #[error("duplicate primary key: {0}")]
    DuplicatePrimaryKey(String),
}

/// Validates a table or column name.
///
/// Accepts non-empty names made of ASCII alphanumerics and underscores that
/// do not start with the reserved `sqlite_` prefix.
pub fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidIdentifier(name.to_string()));
    }
    if name.to_ascii_lowercase().starts_with("sqlite_") {
        return Err(ValidationError::ReservedIdentifier(name.to_string()));
    }
    Ok(())
}

/// Validates a raw condition, sort or select-column fragment.
///
/// Fragments are not parsed. A fragment is rejected when it is blank or
/// contains `;`, `--`, `/*`, `*/` or a NUL byte, which keeps every fragment
/// inside the single statement it is spliced into.
pub fn validate_fragment(fragment: &str) -> Result<(), ValidationError> {
    if fragment.trim().is_empty()
        || FORBIDDEN_FRAGMENT_MARKERS
            .iter()
            .any(|marker| fragment.contains(marker))
    {
        return Err(ValidationError::InvalidFragment(fragment.to_string()));
    }
    Ok(())
}

/// Validates a [`TableDefinition`].
///
/// Checks identifiers, that at least one column exists, and that every
/// primary key names a declared column exactly once.
pub fn validate_table(table: &TableDefinition) -> Result<(), ValidationError> {
    validate_identifier(table.name())?;

    if table.columns().is_empty() {
        return Err(ValidationError::NoColumns(table.name().to_string()));
    }
    for column in table.columns() {
        validate_identifier(&column.name)?;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for key in table.primary_keys() {
        if !seen.insert(key.as_str()) {
            return Err(ValidationError::DuplicatePrimaryKey(key.clone()));
        }
        if table.column(key).is_none() {
            return Err(ValidationError::UnknownPrimaryKey(key.clone()));
        }
    }

    Ok(())
}
