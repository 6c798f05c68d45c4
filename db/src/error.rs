//! Error types for schema document and configuration loading.
//!
//! Every variant here is fatal for the caller: a schema that cannot be read
//! or decoded must not be applied partially.

use thiserror::Error;

/// Errors that can occur while loading schema documents or configuration.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A table entry decoded but does not form a valid definition.
    #[error("invalid table '{table_id}': {source}")]
    InvalidTable {
        /// Key of the offending entry in the document.
        table_id: String,
        /// Underlying validation failure.
        source: table_schema_core::ValidationError,
    },

    /// Configuration value out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for results with [`DocumentError`].
pub type Result<T> = std::result::Result<T, DocumentError>;
