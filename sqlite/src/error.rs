//! Error types for SQLite store operations.
//!
//! Provides a unified error type covering database access, input
//! validation, schema documents, and migration failures.

use std::fmt;

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// An identifier, fragment or table definition failed validation.
    #[error("validation error: {0}")]
    ValidationError(#[from] table_schema_core::ValidationError),

    /// A row in a multi-row insert does not carry the first row's columns.
    #[error("row {row} does not match the columns of the first row")]
    MismatchedColumns {
        /// Zero-based index of the offending row.
        row: usize,
    },

    /// Nothing to write: empty record, assignment set or batch.
    #[error("no data provided")]
    NoData,

    /// Table migration failed; the table was rebuilt from its original
    /// declared schema when possible.
    #[error("migration of table '{table}' failed: {message} (rollback: {rollback})")]
    MigrationFailed {
        /// Table being migrated.
        table: String,
        /// Description of the failing step.
        message: String,
        /// What happened to the original table.
        rollback: RollbackStatus,
        /// Temporary table still holding the backed-up columns when the
        /// rollback could not put them back. It lives until the connection
        /// closes.
        backup: Option<String>,
    },

    /// Error loading a schema document or store configuration.
    #[error("document error: {0}")]
    DocumentError(#[from] table_schema_db::DocumentError),

    /// Creating the directory that holds the database file failed.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result of the rollback attempted after a failed table rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackStatus {
    /// The failure happened before the original table was dropped.
    NotNeeded,
    /// The original declared schema was recreated and the backed-up
    /// columns were copied back.
    Restored,
    /// The original declared schema was recreated but no backup existed,
    /// so the table is empty.
    SchemaOnly,
    /// Recreating the original table failed; the table is gone.
    Failed(String),
}

impl fmt::Display for RollbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackStatus::NotNeeded => f.write_str("not needed"),
            RollbackStatus::Restored => f.write_str("original table restored"),
            RollbackStatus::SchemaOnly => f.write_str("original schema restored without data"),
            RollbackStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
