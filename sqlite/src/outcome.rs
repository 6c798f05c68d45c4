//! Uniform result envelope for CRUD calls.
//!
//! CRUD calls never return `Err`: engine and validation failures are
//! captured into a [`ReturnOutcome`] of kind [`OutcomeKind::Unknown`] with
//! the original error attached as its cause.

use std::fmt;

use crate::convert::ResultRow;
use crate::error::SqliteError;

/// Classification of a CRUD result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// The operation succeeded.
    None,
    /// Reserved for "not attempted yet". The store never returns it: a call
    /// that has not run has no outcome at all.
    Try,
    /// The engine (or input validation) failed; see [`ReturnOutcome::cause`].
    Unknown,
    /// Empty record, assignment set or batch.
    NoData,
    /// A batch insert where fewer rows succeeded than were submitted.
    PartlyInsert,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutcomeKind::None => "NONE",
            OutcomeKind::Try => "TRY",
            OutcomeKind::Unknown => "UNKNOWN",
            OutcomeKind::NoData => "NO_DATA",
            OutcomeKind::PartlyInsert => "PARTLY_INSERT",
        })
    }
}

/// Caller-visible warnings attached to an otherwise valid outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeWarning {
    /// A delete ran without conditions and targeted every row.
    UnconditionedDelete,
    /// An update ran without conditions and targeted every row.
    UnconditionedUpdate,
}

/// Result of a CRUD call: kind, affected rows, selected rows and cause.
///
/// # Examples
///
/// ```
/// use table_schema_sqlite::{OutcomeKind, Record, Store};
///
/// let store = Store::open_in_memory().unwrap();
/// let outcome = store.insert("missing_table", &Record::new().with("a", "1"));
/// assert_eq!(outcome.kind(), OutcomeKind::Unknown);
/// assert!(outcome.cause().is_some());
/// ```
#[derive(Debug)]
pub struct ReturnOutcome {
    kind: OutcomeKind,
    changed_rows: usize,
    rows: Vec<ResultRow>,
    cause: Option<SqliteError>,
    warnings: Vec<OutcomeWarning>,
}

impl ReturnOutcome {
    pub(crate) fn changed(changed_rows: usize) -> Self {
        Self {
            kind: OutcomeKind::None,
            changed_rows,
            rows: Vec::new(),
            cause: None,
            warnings: Vec::new(),
        }
    }

    pub(crate) fn selected(rows: Vec<ResultRow>) -> Self {
        Self {
            rows,
            ..Self::changed(0)
        }
    }

    pub(crate) fn partly_inserted(changed_rows: usize, cause: Option<SqliteError>) -> Self {
        Self {
            kind: OutcomeKind::PartlyInsert,
            cause,
            ..Self::changed(changed_rows)
        }
    }

    /// Classifies a failure: [`SqliteError::NoData`] maps to
    /// [`OutcomeKind::NoData`], everything else to [`OutcomeKind::Unknown`].
    pub(crate) fn failed(cause: SqliteError) -> Self {
        let kind = match cause {
            SqliteError::NoData => OutcomeKind::NoData,
            _ => OutcomeKind::Unknown,
        };
        Self {
            kind,
            cause: Some(cause),
            ..Self::changed(0)
        }
    }

    pub(crate) fn with_warning(mut self, warning: OutcomeWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    /// Result classification.
    pub fn kind(&self) -> OutcomeKind {
        self.kind
    }

    /// Returns `true` for [`OutcomeKind::None`].
    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::None
    }

    /// Rows affected by an insert, update or delete.
    pub fn changed_rows(&self) -> usize {
        self.changed_rows
    }

    /// Selected rows.
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Number of selected rows.
    pub fn result_size(&self) -> usize {
        self.rows.len()
    }

    /// Selected row by index.
    pub fn row(&self, index: usize) -> Option<&ResultRow> {
        self.rows.get(index)
    }

    /// Text value of `column` in row `index`; `None` when the row or column
    /// is absent or the value is SQL `NULL`.
    pub fn column(&self, index: usize, column: &str) -> Option<&str> {
        self.row(index)?.get(column)?.as_deref()
    }

    /// Underlying failure for [`OutcomeKind::Unknown`] and
    /// [`OutcomeKind::NoData`], and the first row failure of a partial batch.
    pub fn cause(&self) -> Option<&SqliteError> {
        self.cause.as_ref()
    }

    /// Warnings raised while executing the call.
    pub fn warnings(&self) -> &[OutcomeWarning] {
        &self.warnings
    }

    /// Converts into a `Result`, turning [`OutcomeKind::Unknown`] into its
    /// cause. Other kinds stay `Ok` so callers can still inspect them.
    pub fn into_result(self) -> Result<Self, SqliteError> {
        match (self.kind, self.cause) {
            (OutcomeKind::Unknown, Some(cause)) => Err(cause),
            (kind, cause) => Ok(Self { kind, cause, ..self }),
        }
    }
}
