//! SQLite backend for declarative table schemas.
//!
//! Keeps the tables of a SQLite database in line with a set of
//! [`TableDefinition`](table_schema_core::TableDefinition)s and offers a
//! small parameterized CRUD layer on top of them.
//!
//! # Architecture
//!
//! - **`introspect`**: reads the live structure of a table
//! - **`diff`**: compares a live table against its definition
//! - **`migration`**: rebuilds mismatching tables (backup, drop, recreate,
//!   restore) with rollback to the original schema
//! - **`schema`**: `CREATE TABLE` / `DROP TABLE` generation
//! - **`query`**: parameterized statement builders
//! - **`convert`** and **`outcome`**: text conversion of results and the
//!   [`ReturnOutcome`] envelope
//! - **`store`**: the [`Store`] tying it all to one connection
//!
//! # Quick start
//!
//! ```
//! use table_schema_core::{ColumnType, SchemaDefinition, TableDefinition};
//! use table_schema_sqlite::{OutcomeKind, Record, Store};
//!
//! let players = TableDefinition::builder("players")
//!     .column("uuid", ColumnType::Integer)
//!     .column("name", ColumnType::Text)
//!     .column("progress", ColumnType::Real)
//!     .primary_key("uuid")
//!     .build()
//!     .unwrap();
//! let schema = SchemaDefinition::new().with_table("players", players);
//!
//! let mut store = Store::open_in_memory().unwrap();
//! assert!(store.apply_schema(&schema).is_success());
//!
//! store.insert("players", &Record::new().with("uuid", "4").with("name", "Test_4").with("progress", "40"));
//! let outcome = store.select("players", &[], &["uuid > 3"], &["uuid desc"]);
//! assert_eq!(outcome.kind(), OutcomeKind::None);
//! assert_eq!(outcome.column(0, "progress"), Some("40.0"));
//! ```
//!
//! # Values
//!
//! All values travel as text. Inserted and updated values are bound as text
//! and converted by the column affinity of the engine; selected values are
//! returned as text, with SQL `NULL` as `None`.

mod convert;
mod diff;
mod error;
mod introspect;
mod migration;
mod outcome;
mod query;
mod schema;
mod store;

pub use convert::ResultRow;
pub use diff::{SchemaMismatch, diff, matches};
pub use error::{Result, RollbackStatus, SqliteError};
pub use introspect::{LiveColumn, LiveSchemaSnapshot, introspect, table_exists};
pub use migration::{MigrationAction, MigrationExecutor, MigrationPlan, MigrationReport, StepStatus};
pub use outcome::{OutcomeKind, OutcomeWarning, ReturnOutcome};
pub use query::{Record, Statement, build_delete, build_insert, build_select, build_update};
pub use schema::{create_table_sql, drop_table_sql, quote_identifier};
pub use store::{ApplyReport, Store};
