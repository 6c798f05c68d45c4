//! Table migration: bring a live table in line with its definition.
//!
//! SQLite cannot alter column types or primary keys in place, so a table
//! that does not match its definition is rebuilt:
//!
//! 1. the columns shared by the live table and the definition are copied
//!    into a temporary backup table;
//! 2. the live table is dropped;
//! 3. the table is recreated from the definition;
//! 4. the backed-up columns are copied back.
//!
//! If step 3 fails, the table is recreated with its original declared
//! schema and the backup is copied into it before the failure is reported.
//! The backup table is dropped once the migration finishes, unless that
//! rollback fails: the backup is then the last copy of the data, so it is
//! kept and named in the error.
//!
//! # Example
//!
//! ```
//! use rusqlite::Connection;
//! use table_schema_core::{ColumnType, TableDefinition};
//! use table_schema_sqlite::{MigrationAction, MigrationExecutor};
//!
//! let conn = Connection::open_in_memory().unwrap();
//! conn.execute_batch("CREATE TABLE t (a INTEGER, b TEXT); INSERT INTO t VALUES (1, 'x');").unwrap();
//!
//! let target = TableDefinition::builder("t")
//!     .column("a", ColumnType::Integer)
//!     .column("c", ColumnType::Real)
//!     .build()
//!     .unwrap();
//!
//! let report = MigrationExecutor::new(&conn).migrate(&target).unwrap();
//! assert_eq!(report.action, MigrationAction::Rebuilt);
//! assert_eq!(report.common_columns, vec!["a".to_string()]);
//! ```

use rusqlite::Connection;
use table_schema_core::TableDefinition;
use tracing::{debug, error, info, warn};

use crate::diff::{SchemaMismatch, diff};
use crate::error::{Result, RollbackStatus, SqliteError};
use crate::introspect::{LiveSchemaSnapshot, introspect};
use crate::schema::{create_table_sql, create_table_sql_from_snapshot, quote_identifier, quoted_list};

/// What a migration did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationAction {
    /// The live table already matched; nothing was touched.
    UpToDate,
    /// The table did not exist and was created.
    Created,
    /// The table was dropped and recreated from its definition.
    Rebuilt,
}

/// Outcome of the backup or restore step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The step does not apply to this migration.
    NotNeeded,
    /// No column survives the rebuild, so there was nothing to copy.
    Skipped,
    /// The step copied `rows` rows.
    Done {
        /// Rows copied.
        rows: usize,
    },
    /// The step failed; the migration continued without it.
    Failed(String),
}

/// Ephemeral plan for rebuilding one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Name of the temporary backup table.
    pub backup_table_name: String,
    /// Target columns also present in the live table, in target order.
    pub common_columns: Vec<String>,
}

impl MigrationPlan {
    /// Builds the plan for rebuilding `target` from the live `existing`
    /// table.
    pub fn new(existing: &LiveSchemaSnapshot, target: &TableDefinition) -> Self {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let mut common_columns: Vec<String> = Vec::new();
        for column in target.columns() {
            let seen = common_columns.iter().any(|c| c.eq_ignore_ascii_case(&column.name));
            if existing.has_column(&column.name) && !seen {
                common_columns.push(column.name.clone());
            }
        }
        Self {
            backup_table_name: format!("tmp_backup_{}_{nanos}", target.name()),
            common_columns,
        }
    }
}

/// Report of a successful migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Migrated table.
    pub table: String,
    /// What was done.
    pub action: MigrationAction,
    /// Why the table was rebuilt; empty unless the action is
    /// [`MigrationAction::Rebuilt`].
    pub mismatches: Vec<SchemaMismatch>,
    /// Columns carried over from the old table.
    pub common_columns: Vec<String>,
    /// Backup step outcome.
    pub backup: StepStatus,
    /// Restore step outcome.
    pub restore: StepStatus,
}

impl MigrationReport {
    fn without_rebuild(table: &TableDefinition, action: MigrationAction) -> Self {
        Self {
            table: table.name().to_string(),
            action,
            mismatches: Vec::new(),
            common_columns: Vec::new(),
            backup: StepStatus::NotNeeded,
            restore: StepStatus::NotNeeded,
        }
    }
}

/// Temporary backup table, dropped when the guard goes out of scope unless
/// it was retained.
struct BackupTable<'c> {
    conn: &'c Connection,
    name: String,
    retained: bool,
}

impl<'c> BackupTable<'c> {
    /// Copies `columns` of `table` into a new temporary table.
    fn create(conn: &'c Connection, name: &str, table: &str, columns: &[String]) -> Result<Self> {
        conn.execute_batch(&format!(
            "CREATE TEMP TABLE {} AS SELECT {} FROM {};",
            quote_identifier(name),
            quoted_list(columns),
            quote_identifier(table)
        ))?;
        Ok(Self {
            conn,
            name: name.to_string(),
            retained: false,
        })
    }

    /// Keeps the table past the guard and returns its name.
    fn retain(mut self) -> String {
        self.retained = true;
        self.name.clone()
    }

    fn qualified_name(&self) -> String {
        format!("temp.{}", quote_identifier(&self.name))
    }

    fn row_count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.qualified_name()),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Copies `columns` from the backup into `table`.
    fn restore_into(&self, table: &str, columns: &[String]) -> Result<usize> {
        let list = quoted_list(columns);
        let rows = self.conn.execute(
            &format!(
                "INSERT INTO {} ({list}) SELECT {list} FROM {}",
                quote_identifier(table),
                self.qualified_name()
            ),
            [],
        )?;
        Ok(rows)
    }
}

impl Drop for BackupTable<'_> {
    fn drop(&mut self) {
        if self.retained {
            warn!(backup = %self.name, "backup table kept for manual recovery");
            return;
        }
        let sql = format!("DROP TABLE IF EXISTS {};", self.qualified_name());
        match self.conn.execute_batch(&sql) {
            Ok(()) => debug!(backup = %self.name, "dropped backup table"),
            Err(e) => warn!(backup = %self.name, error = %e, "failed to drop backup table"),
        }
    }
}

/// Runs migrations over a borrowed connection.
///
/// Each call to [`migrate`](Self::migrate) introspects the table afresh;
/// nothing is cached between calls.
pub struct MigrationExecutor<'c> {
    conn: &'c Connection,
}

impl<'c> MigrationExecutor<'c> {
    /// Creates an executor for `conn`.
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Migrates the live table to `target`.
    ///
    /// A missing table is created; a matching one is left alone; anything
    /// else is rebuilt.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::DatabaseError`] if introspection fails and
    /// [`SqliteError::MigrationFailed`] if the table could not be dropped or
    /// recreated. In the latter case the error carries the rollback status.
    pub fn migrate(&self, target: &TableDefinition) -> Result<MigrationReport> {
        let Some(existing) = introspect(self.conn, target.name())? else {
            info!(table = target.name(), "table missing, creating");
            self.conn
                .execute_batch(&create_table_sql(target, false))
                .map_err(|e| {
                    failed(target, format!("create failed: {e}"), RollbackStatus::NotNeeded, None)
                })?;
            return Ok(MigrationReport::without_rebuild(target, MigrationAction::Created));
        };

        let mismatches = diff(&existing, target);
        if mismatches.is_empty() {
            debug!(table = target.name(), "table matches definition");
            return Ok(MigrationReport::without_rebuild(target, MigrationAction::UpToDate));
        }

        info!(
            table = target.name(),
            reasons = ?mismatches.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "table differs from definition, rebuilding"
        );
        let plan = MigrationPlan::new(&existing, target);
        self.rebuild(plan, &existing, target, mismatches)
    }

    /// Rebuilds the table following `plan`. `existing` is the live
    /// structure the rollback falls back to.
    pub(crate) fn rebuild(
        &self,
        plan: MigrationPlan,
        existing: &LiveSchemaSnapshot,
        target: &TableDefinition,
        mismatches: Vec<SchemaMismatch>,
    ) -> Result<MigrationReport> {
        let table = target.name();

        let (backup, backup_status) = if plan.common_columns.is_empty() {
            warn!(table, "no column survives the rebuild, existing data is discarded");
            (None, StepStatus::Skipped)
        } else {
            let created = BackupTable::create(self.conn, &plan.backup_table_name, table, &plan.common_columns)
                .and_then(|backup| backup.row_count().map(|rows| (backup, rows)));
            match created {
                Ok((backup, rows)) => {
                    debug!(table, backup = %plan.backup_table_name, rows, "backed up common columns");
                    (Some(backup), StepStatus::Done { rows })
                }
                Err(e) => {
                    warn!(table, error = %e, "backup failed, continuing without it");
                    (None, StepStatus::Failed(e.to_string()))
                }
            }
        };

        if let Err(e) = self.conn.execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_identifier(table))) {
            error!(table, error = %e, "drop failed, table left untouched");
            return Err(failed(
                target,
                format!("drop failed: {e}"),
                RollbackStatus::NotNeeded,
                None,
            ));
        }

        if let Err(e) = self.conn.execute_batch(&create_table_sql(target, false)) {
            error!(table, error = %e, "recreate failed, rolling back to original schema");
            let (rollback, kept) = self.roll_back(table, existing, backup, &plan.common_columns);
            return Err(failed(target, format!("recreate failed: {e}"), rollback, kept));
        }

        let restore = match &backup {
            None => StepStatus::NotNeeded,
            Some(backup) => match backup.restore_into(table, &plan.common_columns) {
                Ok(rows) => {
                    debug!(table, rows, "restored common columns");
                    StepStatus::Done { rows }
                }
                Err(e) => {
                    warn!(table, error = %e, "restore failed, rebuilt table keeps partial data");
                    StepStatus::Failed(e.to_string())
                }
            },
        };

        info!(table, "table rebuilt");
        Ok(MigrationReport {
            table: table.to_string(),
            action: MigrationAction::Rebuilt,
            mismatches,
            common_columns: plan.common_columns,
            backup: backup_status,
            restore,
        })
    }

    /// Recreates the original declared schema and copies the backup back.
    ///
    /// Returns the rollback status and, when the data could not be put
    /// back, the name of the retained backup table.
    fn roll_back(
        &self,
        table: &str,
        existing: &LiveSchemaSnapshot,
        backup: Option<BackupTable<'_>>,
        columns: &[String],
    ) -> (RollbackStatus, Option<String>) {
        if let Err(e) = self
            .conn
            .execute_batch(&create_table_sql_from_snapshot(table, existing))
        {
            error!(table, error = %e, "rollback failed, table is gone");
            return (RollbackStatus::Failed(e.to_string()), backup.map(BackupTable::retain));
        }

        let Some(backup) = backup else {
            warn!(table, "original schema restored without data");
            return (RollbackStatus::SchemaOnly, None);
        };

        match backup.restore_into(table, columns) {
            Ok(rows) => {
                info!(table, rows, "original table restored");
                (RollbackStatus::Restored, None)
            }
            Err(e) => {
                error!(table, error = %e, "original schema restored but data copy failed");
                (
                    RollbackStatus::Failed(format!("data copy failed: {e}")),
                    Some(backup.retain()),
                )
            }
        }
    }
}

fn failed(
    target: &TableDefinition,
    message: String,
    rollback: RollbackStatus,
    backup: Option<String>,
) -> SqliteError {
    SqliteError::MigrationFailed {
        table: target.name().to_string(),
        message,
        rollback,
        backup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_schema_core::ColumnType;

    fn conn_with(ddl: &str) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(ddl).unwrap();
        conn
    }

    fn temp_tables(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_temp_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_table_is_created() {
        let conn = Connection::open_in_memory().unwrap();
        let target = TableDefinition::builder("t")
            .column("a", ColumnType::Integer)
            .build()
            .unwrap();
        let report = MigrationExecutor::new(&conn).migrate(&target).unwrap();
        assert_eq!(report.action, MigrationAction::Created);
        assert!(introspect(&conn, "t").unwrap().is_some());
    }

    #[test]
    fn test_matching_table_is_untouched() {
        let conn = conn_with("CREATE TABLE t (a INTEGER); INSERT INTO t VALUES (7);");
        let target = TableDefinition::builder("t")
            .column("a", ColumnType::Integer)
            .build()
            .unwrap();
        let report = MigrationExecutor::new(&conn).migrate(&target).unwrap();
        assert_eq!(report.action, MigrationAction::UpToDate);
        assert_eq!(report.backup, StepStatus::NotNeeded);
    }

    #[test]
    fn test_plan_keeps_target_order() {
        let conn = conn_with("CREATE TABLE t (c TEXT, b TEXT, a TEXT);");
        let existing = introspect(&conn, "t").unwrap().unwrap();
        let target = TableDefinition::builder("t")
            .column("a", ColumnType::Text)
            .column("x", ColumnType::Text)
            .column("c", ColumnType::Text)
            .build()
            .unwrap();
        let plan = MigrationPlan::new(&existing, &target);
        assert_eq!(plan.common_columns, vec!["a".to_string(), "c".to_string()]);
        assert!(plan.backup_table_name.starts_with("tmp_backup_t_"));
    }

    #[test]
    fn test_rebuild_restores_and_drops_backup() {
        let conn = conn_with(
            "CREATE TABLE t (a INTEGER, b TEXT); INSERT INTO t VALUES (1, 'x'), (2, 'y');",
        );
        let target = TableDefinition::builder("t")
            .column("a", ColumnType::Integer)
            .column("b", ColumnType::Text)
            .primary_key("a")
            .build()
            .unwrap();
        let report = MigrationExecutor::new(&conn).migrate(&target).unwrap();
        assert_eq!(report.action, MigrationAction::Rebuilt);
        assert_eq!(report.backup, StepStatus::Done { rows: 2 });
        assert_eq!(report.restore, StepStatus::Done { rows: 2 });
        assert_eq!(temp_tables(&conn), 0);

        let live = introspect(&conn, "t").unwrap().unwrap();
        assert_eq!(live.primary_keys(), ["a".to_string()]);
    }

    #[test]
    fn test_no_common_columns_skips_backup() {
        let conn = conn_with("CREATE TABLE t (a INTEGER); INSERT INTO t VALUES (1);");
        let target = TableDefinition::builder("t")
            .column("z", ColumnType::Text)
            .build()
            .unwrap();
        let report = MigrationExecutor::new(&conn).migrate(&target).unwrap();
        assert_eq!(report.backup, StepStatus::Skipped);
        assert_eq!(report.restore, StepStatus::NotNeeded);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_failed_recreate_rolls_back_original() {
        let conn = conn_with(
            "CREATE TABLE t (a INTEGER, b TEXT); INSERT INTO t VALUES (1, 'x'), (2, 'y');",
        );
        let target = TableDefinition::builder("t")
            .column("a", ColumnType::Text)
            .column("a", ColumnType::Integer)
            .build()
            .unwrap();

        let err = MigrationExecutor::new(&conn).migrate(&target).unwrap_err();
        match err {
            SqliteError::MigrationFailed { table, rollback, .. } => {
                assert_eq!(table, "t");
                assert_eq!(rollback, RollbackStatus::Restored);
            }
            other => panic!("unexpected error: {other}"),
        }

        let live = introspect(&conn, "t").unwrap().unwrap();
        assert_eq!(live.column("a").unwrap().declared_type, "INTEGER");
        assert!(live.has_column("b"));
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t WHERE a IS NOT NULL", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(temp_tables(&conn), 0);
    }

    fn count_rows(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    fn duplicate_column_target() -> TableDefinition {
        TableDefinition::builder("t")
            .column("a", ColumnType::Text)
            .column("a", ColumnType::Integer)
            .build()
            .unwrap()
    }

    #[test]
    fn test_column_name_case_difference_keeps_data() {
        let conn = conn_with("CREATE TABLE t (a INTEGER, Name TEXT); INSERT INTO t VALUES (1, 'keep');");
        let same = TableDefinition::builder("t")
            .column("a", ColumnType::Integer)
            .column("name", ColumnType::Text)
            .build()
            .unwrap();
        let report = MigrationExecutor::new(&conn).migrate(&same).unwrap();
        assert_eq!(report.action, MigrationAction::UpToDate);

        let keyed = TableDefinition::builder("t")
            .column("a", ColumnType::Integer)
            .column("name", ColumnType::Text)
            .primary_key("a")
            .build()
            .unwrap();
        let report = MigrationExecutor::new(&conn).migrate(&keyed).unwrap();
        assert_eq!(report.action, MigrationAction::Rebuilt);
        assert_eq!(report.common_columns, vec!["a".to_string(), "name".to_string()]);
        let name: String = conn
            .query_row("SELECT name FROM t WHERE a = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "keep");
    }

    #[test]
    fn test_restore_failure_still_completes() {
        let conn = conn_with(
            "CREATE TABLE t (a INTEGER, b TEXT, PRIMARY KEY (a)); INSERT INTO t VALUES (1, 'x'), (2, 'x');",
        );
        let target = TableDefinition::builder("t")
            .column("a", ColumnType::Integer)
            .column("b", ColumnType::Text)
            .primary_key("b")
            .build()
            .unwrap();

        let report = MigrationExecutor::new(&conn).migrate(&target).unwrap();
        assert_eq!(report.action, MigrationAction::Rebuilt);
        assert_eq!(report.backup, StepStatus::Done { rows: 2 });
        assert!(matches!(&report.restore, StepStatus::Failed(reason) if reason.contains("UNIQUE")));
        assert_eq!(count_rows(&conn, "t"), 0);
        assert_eq!(temp_tables(&conn), 0);

        let live = introspect(&conn, "t").unwrap().unwrap();
        assert_eq!(live.primary_keys(), ["b".to_string()]);
    }

    #[test]
    fn test_backup_failure_continues_without_backup() {
        let conn = conn_with(
            "CREATE TABLE t (a INTEGER, b TEXT); INSERT INTO t VALUES (1, 'x'); CREATE TEMP TABLE taken (x);",
        );
        let existing = introspect(&conn, "t").unwrap().unwrap();
        let target = TableDefinition::builder("t")
            .column("a", ColumnType::Integer)
            .column("b", ColumnType::Text)
            .primary_key("a")
            .build()
            .unwrap();
        let plan = MigrationPlan {
            backup_table_name: "taken".into(),
            common_columns: vec!["a".into(), "b".into()],
        };

        let mismatches = diff(&existing, &target);
        let report = MigrationExecutor::new(&conn)
            .rebuild(plan, &existing, &target, mismatches)
            .unwrap();
        assert_eq!(report.action, MigrationAction::Rebuilt);
        assert!(matches!(report.backup, StepStatus::Failed(_)));
        assert_eq!(report.restore, StepStatus::NotNeeded);
        assert_eq!(count_rows(&conn, "t"), 0);
        assert_eq!(introspect(&conn, "t").unwrap().unwrap().primary_keys(), ["a".to_string()]);
        // Only the pre-existing temp table is left.
        assert_eq!(temp_tables(&conn), 1);
    }

    #[test]
    fn test_rollback_without_backup_restores_schema_only() {
        let conn = conn_with(
            "CREATE TABLE t (a INTEGER, b TEXT); INSERT INTO t VALUES (1, 'x'); CREATE TEMP TABLE taken (x);",
        );
        let existing = introspect(&conn, "t").unwrap().unwrap();
        let plan = MigrationPlan {
            backup_table_name: "taken".into(),
            common_columns: vec!["a".into()],
        };

        let err = MigrationExecutor::new(&conn)
            .rebuild(plan, &existing, &duplicate_column_target(), Vec::new())
            .unwrap_err();
        match err {
            SqliteError::MigrationFailed { rollback, backup, .. } => {
                assert_eq!(rollback, RollbackStatus::SchemaOnly);
                assert_eq!(backup, None);
            }
            other => panic!("unexpected error: {other}"),
        }

        let live = introspect(&conn, "t").unwrap().unwrap();
        assert_eq!(live, existing);
        assert_eq!(count_rows(&conn, "t"), 0);
    }

    #[test]
    fn test_failed_rollback_keeps_backup() {
        let conn = conn_with(
            "CREATE TABLE t (a INTEGER, b TEXT); INSERT INTO t VALUES (1, 'x'), (2, 'y');",
        );
        let existing = introspect(&conn, "t").unwrap().unwrap();
        let target = duplicate_column_target();
        let plan = MigrationPlan::new(&existing, &target);
        // A snapshot without columns cannot be recreated.
        let unrecreatable = LiveSchemaSnapshot::from_parts(Vec::new(), Vec::new());

        let err = MigrationExecutor::new(&conn)
            .rebuild(plan, &unrecreatable, &target, Vec::new())
            .unwrap_err();
        let backup = match err {
            SqliteError::MigrationFailed {
                rollback: RollbackStatus::Failed(_),
                backup: Some(backup),
                ..
            } => backup,
            other => panic!("unexpected error: {other}"),
        };

        assert!(backup.starts_with("tmp_backup_t_"));
        assert!(!crate::introspect::table_exists(&conn, "t").unwrap());
        assert_eq!(temp_tables(&conn), 1);
        assert_eq!(count_rows(&conn, &format!("temp.{}", quote_identifier(&backup))), 2);
    }
}
