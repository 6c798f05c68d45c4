//! The [`Store`]: one SQLite connection plus schema and CRUD operations.
//!
//! Schema operations (`create_table`, `delete_table`, `migrate_table`,
//! `apply_schema`) take `&mut self` and return `Result`. CRUD operations
//! take `&self` and always return a [`ReturnOutcome`]; failures are
//! classified inside the outcome instead of being returned as `Err`.

use std::path::Path;

use rusqlite::{Connection, InterruptHandle, params_from_iter};
use table_schema_core::{SchemaDefinition, TableDefinition};
use table_schema_db::{SchemaDocument, StoreConfig};
use tracing::{debug, info, warn};

use crate::convert::{ResultRow, collect_rows};
use crate::error::{Result, SqliteError};
use crate::migration::{MigrationExecutor, MigrationReport};
use crate::outcome::{OutcomeWarning, ReturnOutcome};
use crate::query::{Record, Statement, build_delete, build_insert, build_select, build_update};
use crate::schema::{create_table_sql, drop_table_sql};

/// A SQLite database managed through declarative table definitions.
///
/// The store owns a single connection and every call is synchronous.
/// `Connection` is `Send` but not `Sync`, so a store shared between threads
/// has to sit behind the caller's own mutex. Long-running statements can be
/// cancelled from another thread through [`interrupt_handle`](Self::interrupt_handle).
///
/// # Examples
///
/// ```
/// use table_schema_core::{ColumnType, TableDefinition};
/// use table_schema_sqlite::{OutcomeKind, Record, Store};
///
/// let mut store = Store::open_in_memory().unwrap();
/// let players = TableDefinition::builder("players")
///     .column("uuid", ColumnType::Integer)
///     .column("name", ColumnType::Text)
///     .primary_key("uuid")
///     .build()
///     .unwrap();
/// store.create_table(&players).unwrap();
///
/// let outcome = store.insert("players", &Record::new().with("uuid", "1").with("name", "Alex"));
/// assert_eq!(outcome.kind(), OutcomeKind::None);
/// assert_eq!(outcome.changed_rows(), 1);
///
/// let outcome = store.select("players", &["name"], &["uuid = 1"], &[]);
/// assert_eq!(outcome.column(0, "name"), Some("Alex"));
/// ```
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (or creates) the database at `path` with default settings.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(&StoreConfig::new(path.as_ref()))
    }

    /// Opens the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::IoError`] if the parent directory cannot be
    /// created and [`SqliteError::DatabaseError`] if the database cannot be
    /// opened or configured.
    pub fn open_with_config(config: &StoreConfig) -> Result<Self> {
        if config.create_parent_dirs {
            if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(config.busy_timeout())?;
        if config.foreign_keys {
            conn.pragma_update(None, "foreign_keys", true)?;
        }
        info!(path = %config.path.display(), "opened store");
        Ok(Self { conn })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Wraps an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Handle that interrupts the statement currently running on this
    /// store. The interrupted call fails with an engine error.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    /// Closes the connection, reporting any error the engine raises.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| SqliteError::from(e))
    }

    /// Creates `table` if it does not exist. An existing table is left as
    /// it is, even when it differs from the definition.
    pub fn create_table(&mut self, table: &TableDefinition) -> Result<()> {
        self.conn.execute_batch(&create_table_sql(table, true))?;
        debug!(table = table.name(), "create table if not exists");
        Ok(())
    }

    /// Drops `table` if it exists.
    pub fn delete_table(&mut self, table: &str) -> Result<()> {
        self.conn.execute_batch(&drop_table_sql(table)?)?;
        info!(table, "dropped table");
        Ok(())
    }

    /// Brings the live table in line with `table`, rebuilding it when it
    /// differs. See [`MigrationExecutor::migrate`].
    pub fn migrate_table(&mut self, table: &TableDefinition) -> Result<MigrationReport> {
        MigrationExecutor::new(&self.conn).migrate(table)
    }

    /// Migrates every table of `schema`, in table-id order.
    ///
    /// Tables are processed independently: a failure on one is recorded in
    /// the report and the remaining tables are still migrated.
    pub fn apply_schema(&mut self, schema: &SchemaDefinition) -> ApplyReport {
        let mut report = ApplyReport::default();
        for (table_id, table) in schema.tables() {
            let result = self.migrate_table(table);
            if let Err(e) = &result {
                warn!(table_id, table = table.name(), error = %e, "table migration failed");
            }
            report.results.push((table_id.to_string(), result));
        }
        info!(
            tables = report.len(),
            failed = report.failures().count(),
            "schema applied"
        );
        report
    }

    /// Loads the schema document at `path` and applies it.
    ///
    /// A missing document is created empty, so the first run against a new
    /// path applies nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::DocumentError`] when the document cannot be
    /// read, parsed or validated. Per-table failures are in the report.
    pub fn apply_schema_file(&mut self, path: impl AsRef<Path>) -> Result<ApplyReport> {
        let schema = SchemaDocument::load_or_init(path)?;
        Ok(self.apply_schema(&schema))
    }

    /// Selects rows from `table`.
    ///
    /// `columns` defaults to `*` when empty. Conditions are AND-joined and
    /// sort fragments carry their own direction (`"uuid desc"`).
    pub fn select(
        &self,
        table: &str,
        columns: &[&str],
        conditions: &[&str],
        sort: &[&str],
    ) -> ReturnOutcome {
        build_select(table, columns, conditions, sort)
            .and_then(|stmt| self.query(&stmt))
            .map_or_else(ReturnOutcome::failed, ReturnOutcome::selected)
    }

    /// Inserts one row.
    pub fn insert(&self, table: &str, row: &Record) -> ReturnOutcome {
        self.insert_all(table, std::slice::from_ref(row))
    }

    /// Inserts each row with its own statement.
    ///
    /// Rows succeed or fail independently: a failing row is logged and
    /// skipped, the others are kept. When any row fails the outcome is
    /// [`OutcomeKind::PartlyInsert`](crate::OutcomeKind::PartlyInsert) with
    /// the number of rows that made it and the first failure as cause.
    pub fn insert_batch(&self, table: &str, rows: &[Record]) -> ReturnOutcome {
        if rows.is_empty() {
            return ReturnOutcome::failed(SqliteError::NoData);
        }

        let mut changed = 0;
        let mut first_error = None;
        for (index, row) in rows.iter().enumerate() {
            match build_insert(table, std::slice::from_ref(row)).and_then(|stmt| self.execute(&stmt)) {
                Ok(n) => changed += n,
                Err(e) => {
                    warn!(table, row = index, error = %e, "batch row rejected");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            None => ReturnOutcome::changed(changed),
            Some(cause) => ReturnOutcome::partly_inserted(changed, Some(cause)),
        }
    }

    /// Inserts all rows with a single statement: either every row is
    /// written or none is. Every row must set the same columns.
    pub fn insert_batch_atomic(&self, table: &str, rows: &[Record]) -> ReturnOutcome {
        self.insert_all(table, rows)
    }

    /// Updates rows matching `conditions`; every row when there are none,
    /// which is flagged with a warning.
    pub fn update(&self, table: &str, assignments: &Record, conditions: &[&str]) -> ReturnOutcome {
        self.modify(
            build_update(table, assignments, conditions),
            table,
            OutcomeWarning::UnconditionedUpdate,
        )
    }

    /// Deletes rows matching `conditions`; every row when there are none,
    /// which is flagged with a warning.
    pub fn delete(&self, table: &str, conditions: &[&str]) -> ReturnOutcome {
        self.modify(
            build_delete(table, conditions),
            table,
            OutcomeWarning::UnconditionedDelete,
        )
    }

    fn insert_all(&self, table: &str, rows: &[Record]) -> ReturnOutcome {
        build_insert(table, rows)
            .and_then(|stmt| self.execute(&stmt))
            .map_or_else(ReturnOutcome::failed, ReturnOutcome::changed)
    }

    fn modify(&self, stmt: Result<Statement>, table: &str, warning: OutcomeWarning) -> ReturnOutcome {
        let stmt = match stmt {
            Ok(stmt) => stmt,
            Err(e) => return ReturnOutcome::failed(e),
        };
        let outcome = match self.execute(&stmt) {
            Ok(n) => ReturnOutcome::changed(n),
            Err(e) => return ReturnOutcome::failed(e),
        };
        if stmt.is_unconditioned() {
            warn!(table, rows = outcome.changed_rows(), "statement without conditions touched every row");
            return outcome.with_warning(warning);
        }
        outcome
    }

    fn execute(&self, stmt: &Statement) -> Result<usize> {
        debug!(sql = stmt.sql(), params = stmt.params().len(), "execute");
        Ok(self.conn.execute(stmt.sql(), params_from_iter(stmt.params()))?)
    }

    fn query(&self, stmt: &Statement) -> Result<Vec<ResultRow>> {
        debug!(sql = stmt.sql(), "query");
        let mut prepared = self.conn.prepare(stmt.sql())?;
        let columns: Vec<String> = prepared
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let rows = prepared.query(params_from_iter(stmt.params()))?;
        collect_rows(rows, &columns)
    }
}

/// Per-table results of [`Store::apply_schema`], in table-id order.
#[derive(Debug, Default)]
pub struct ApplyReport {
    results: Vec<(String, Result<MigrationReport>)>,
}

impl ApplyReport {
    /// `(table id, result)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Result<MigrationReport>)> {
        self.results.iter().map(|(id, r)| (id.as_str(), r))
    }

    /// Result for one table id.
    pub fn get(&self, table_id: &str) -> Option<&Result<MigrationReport>> {
        self.results
            .iter()
            .find(|(id, _)| id == table_id)
            .map(|(_, r)| r)
    }

    /// Tables that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &SqliteError)> {
        self.results
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (id.as_str(), e)))
    }

    /// Returns `true` if every table migrated.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|(_, r)| r.is_ok())
    }

    /// Number of tables processed.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Returns `true` if the schema had no tables.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::OutcomeKind;
    use table_schema_core::ColumnType;

    fn store_with_users() -> Store {
        let mut store = Store::open_in_memory().unwrap();
        let users = TableDefinition::builder("users")
            .column("id", ColumnType::Integer)
            .column("name", ColumnType::Text)
            .primary_key("id")
            .build()
            .unwrap();
        store.create_table(&users).unwrap();
        store
    }

    #[test]
    fn test_create_table_is_idempotent() {
        let mut store = store_with_users();
        let users = TableDefinition::builder("users")
            .column("other", ColumnType::Blob)
            .build()
            .unwrap();
        store.create_table(&users).unwrap();
        let live = crate::introspect(store.connection(), "users").unwrap().unwrap();
        assert!(live.has_column("id"));
        assert!(!live.has_column("other"));
    }

    #[test]
    fn test_delete_table() {
        let mut store = store_with_users();
        store.delete_table("users").unwrap();
        store.delete_table("users").unwrap();
        assert!(!crate::table_exists(store.connection(), "users").unwrap());
        assert!(store.delete_table("users; --").is_err());
    }

    #[test]
    fn test_insert_empty_record_is_no_data() {
        let store = store_with_users();
        let outcome = store.insert("users", &Record::new());
        assert_eq!(outcome.kind(), OutcomeKind::NoData);
        assert_eq!(store.insert_batch("users", &[]).kind(), OutcomeKind::NoData);
        assert_eq!(store.insert_batch_atomic("users", &[]).kind(), OutcomeKind::NoData);
        let outcome = store.update("users", &Record::new(), &["id = 1"]);
        assert_eq!(outcome.kind(), OutcomeKind::NoData);
    }

    #[test]
    fn test_engine_failure_is_unknown_with_cause() {
        let store = store_with_users();
        let outcome = store.select("missing", &[], &[], &[]);
        assert_eq!(outcome.kind(), OutcomeKind::Unknown);
        assert!(matches!(outcome.cause(), Some(SqliteError::DatabaseError(_))));

        let outcome = store.select("users", &[], &["1=1; DROP TABLE users"], &[]);
        assert_eq!(outcome.kind(), OutcomeKind::Unknown);
        assert!(matches!(outcome.cause(), Some(SqliteError::ValidationError(_))));
    }

    #[test]
    fn test_atomic_batch_is_all_or_nothing() {
        let store = store_with_users();
        let rows = [
            Record::new().with("id", "1").with("name", "a"),
            Record::new().with("id", "1").with("name", "b"),
        ];
        let outcome = store.insert_batch_atomic("users", &rows);
        assert_eq!(outcome.kind(), OutcomeKind::Unknown);
        assert_eq!(store.select("users", &[], &[], &[]).result_size(), 0);

        let outcome = store.insert_batch("users", &rows);
        assert_eq!(outcome.kind(), OutcomeKind::PartlyInsert);
        assert_eq!(outcome.changed_rows(), 1);
        assert!(outcome.cause().is_some());
    }

    #[test]
    fn test_unconditioned_update_warns() {
        let store = store_with_users();
        store.insert("users", &Record::new().with("id", "1").with("name", "a"));
        store.insert("users", &Record::new().with("id", "2").with("name", "b"));

        let outcome = store.update("users", &Record::new().with("name", "z"), &[]);
        assert_eq!(outcome.changed_rows(), 2);
        assert_eq!(outcome.warnings(), [OutcomeWarning::UnconditionedUpdate]);

        let outcome = store.update("users", &Record::new().with("name", "y"), &["id = 1"]);
        assert_eq!(outcome.changed_rows(), 1);
        assert!(outcome.warnings().is_empty());
    }

    #[test]
    fn test_close() {
        let store = store_with_users();
        store.close().unwrap();
    }
}
