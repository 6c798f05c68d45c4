//! Core table definition types for declarative SQLite schemas.
//!
//! This crate defines the target side of schema reconciliation:
//!
//! - [`ColumnType`]: the five SQLite storage classes.
//! - [`ColumnDefinition`]: a named, typed column.
//! - [`TableDefinition`]: ordered columns plus a primary-key set, validated
//!   at construction.
//! - [`SchemaDefinition`]: an immutable set of tables keyed by id.
//!
//! Validation ([`validate_identifier`], [`validate_fragment`],
//! [`validate_table`]) guards everything that ends up spliced into
//! statement text.
//!
//! # Example
//!
//! ```
//! use table_schema_core::*;
//!
//! let table = TableDefinition::builder("scores")
//!     .column("player", ColumnType::Text)
//!     .column("level", ColumnType::Integer)
//!     .column("points", ColumnType::Real)
//!     .primary_key("player")
//!     .primary_key("level")
//!     .build()
//!     .unwrap();
//!
//! let schema = SchemaDefinition::new().with_table("scores", table);
//! assert_eq!(schema.get("scores").unwrap().primary_keys().len(), 2);
//! ```

mod types;
mod validate;

pub use types::*;
pub use validate::{ValidationError, validate_fragment, validate_identifier, validate_table};
