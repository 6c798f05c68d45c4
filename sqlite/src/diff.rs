//! Comparison of a live table against its target definition.
//!
//! The comparison is all-or-nothing: any reported mismatch means the table
//! is rebuilt. Nothing is patched column by column.

use std::collections::HashSet;
use std::fmt;

use table_schema_core::TableDefinition;

use crate::introspect::LiveSchemaSnapshot;

/// One reason a live table does not match its definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaMismatch {
    /// Different number of columns; extra live columns count as a mismatch
    /// even when every target column is present.
    ColumnCount {
        /// Columns in the live table.
        live: usize,
        /// Columns in the definition.
        target: usize,
    },
    /// A target column is missing from the live table.
    MissingColumn(String),
    /// A column exists with a different declared type.
    TypeChanged {
        /// Column name.
        column: String,
        /// Declared type in the live table.
        live: String,
        /// Declared type in the definition.
        target: String,
    },
    /// The primary-key sets differ.
    PrimaryKeyChanged {
        /// Live primary keys.
        live: Vec<String>,
        /// Target primary keys.
        target: Vec<String>,
    },
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaMismatch::ColumnCount { live, target } => {
                write!(f, "column count {live} != {target}")
            }
            SchemaMismatch::MissingColumn(name) => write!(f, "missing column {name}"),
            SchemaMismatch::TypeChanged {
                column,
                live,
                target,
            } => write!(f, "column {column} is '{live}', expected '{target}'"),
            SchemaMismatch::PrimaryKeyChanged { live, target } => {
                write!(f, "primary key {live:?} != {target:?}")
            }
        }
    }
}

/// Lists every way `existing` differs from `target`.
///
/// Names and types compare case-insensitively; primary keys compare as sets.
pub fn diff(existing: &LiveSchemaSnapshot, target: &TableDefinition) -> Vec<SchemaMismatch> {
    let mut mismatches = Vec::new();

    if existing.columns().len() != target.columns().len() {
        mismatches.push(SchemaMismatch::ColumnCount {
            live: existing.columns().len(),
            target: target.columns().len(),
        });
    }

    for column in target.columns() {
        match existing.column(&column.name) {
            None => mismatches.push(SchemaMismatch::MissingColumn(column.name.clone())),
            Some(live) if !column.column_type.matches_declared(&live.declared_type) => {
                mismatches.push(SchemaMismatch::TypeChanged {
                    column: column.name.clone(),
                    live: live.declared_type.clone(),
                    target: column.column_type.declared_type().to_string(),
                });
            }
            Some(_) => {}
        }
    }

    let live_keys = key_set(existing.primary_keys());
    let target_keys = key_set(target.primary_keys());
    if live_keys != target_keys {
        mismatches.push(SchemaMismatch::PrimaryKeyChanged {
            live: existing.primary_keys().to_vec(),
            target: target.primary_keys().to_vec(),
        });
    }

    mismatches
}

fn key_set(keys: &[String]) -> HashSet<String> {
    keys.iter().map(|k| k.to_ascii_lowercase()).collect()
}

/// Returns `true` if the live table already matches the definition.
pub fn matches(existing: &LiveSchemaSnapshot, target: &TableDefinition) -> bool {
    diff(existing, target).is_empty()
}
