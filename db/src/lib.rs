//! Schema document loading and store configuration.
//!
//! This crate sits between files on disk and the store: it decodes schema
//! documents (JSON or YAML) into validated
//! [`SchemaDefinition`](table_schema_core::SchemaDefinition) values and
//! reads the [`StoreConfig`] used to open a database.
//!
//! # Quick start
//!
//! ```no_run
//! use table_schema_db::{SchemaDocument, StoreConfig};
//!
//! // Missing or empty files yield an empty schema plus a warning.
//! let schema = SchemaDocument::load_or_init("plugins/minigame/schema_default.json").unwrap();
//! println!("{} tables defined", schema.len());
//!
//! let config = StoreConfig::load("plugins/minigame/store.yml").unwrap();
//! println!("database at {}", config.path.display());
//! ```

mod config;
mod error;
mod loader;

pub use config::{DEFAULT_BUSY_TIMEOUT_MS, StoreConfig};
pub use error::{DocumentError, Result};
pub use loader::{ColumnEntry, DocumentFormat, SchemaDocument, TableEntry};
