//! Table definition types for declarative SQLite schemas.
//!
//! This module defines the target-side data model: what a table *should*
//! look like. The types serialize with [`serde`] so they can travel through
//! JSON and YAML schema documents, and they are validated at construction so
//! a [`TableDefinition`] can always be turned into well-formed DDL.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Storage class of a column.
///
/// These are the five SQLite storage classes. Parsing is case-insensitive;
/// display and serialization use the upper-case SQL spelling.
///
/// # Examples
///
/// ```
/// use table_schema_core::ColumnType;
///
/// let ty: ColumnType = "integer".parse().unwrap();
/// assert_eq!(ty, ColumnType::Integer);
/// assert_eq!(ty.to_string(), "INTEGER");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    /// No declared type (the column has no affinity).
    Null,
    /// Signed integer.
    Integer,
    /// 8-byte IEEE floating point.
    Real,
    /// UTF-8 text.
    Text,
    /// Raw bytes.
    Blob,
}

impl ColumnType {
    /// Returns the upper-case name of the storage class.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Null => "NULL",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
        }
    }

    /// Returns the type name written into `CREATE TABLE`.
    ///
    /// `NULL` is not a type name in SQLite's grammar, so a [`ColumnType::Null`]
    /// column is declared without one. The live table then reports an empty
    /// declared type, which is what this returns.
    pub fn declared_type(&self) -> &'static str {
        match self {
            ColumnType::Null => "",
            other => other.as_str(),
        }
    }

    /// Returns `true` if a declared type reported by the engine denotes
    /// this storage class. Comparison is case-insensitive.
    pub fn matches_declared(&self, declared: &str) -> bool {
        declared.trim().eq_ignore_ascii_case(self.declared_type())
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NULL" => Ok(ColumnType::Null),
            "INTEGER" => Ok(ColumnType::Integer),
            "REAL" => Ok(ColumnType::Real),
            "TEXT" => Ok(ColumnType::Text),
            "BLOB" => Ok(ColumnType::Blob),
            _ => Err(ValidationError::UnknownColumnType(s.to_string())),
        }
    }
}

/// A single column of a [`TableDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Storage class.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    /// Creates a column definition.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Desired shape of one table: ordered columns plus a primary-key set.
///
/// Column order matters for the generated `CREATE TABLE` statement but not
/// for comparison against a live table. Construction validates that the
/// table and every column carry a plain identifier, that at least one
/// column exists, and that every primary key names a declared column.
/// Duplicate column names are left to the engine, which rejects them when
/// the table is created.
///
/// # Examples
///
/// ```
/// use table_schema_core::{ColumnType, TableDefinition};
///
/// let table = TableDefinition::builder("players")
///     .column("uuid", ColumnType::Integer)
///     .column("name", ColumnType::Text)
///     .column("progress", ColumnType::Real)
///     .primary_key("uuid")
///     .build()
///     .unwrap();
///
/// assert_eq!(table.name(), "players");
/// assert_eq!(table.columns().len(), 3);
/// assert!(table.is_primary_key("uuid"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    #[serde(rename = "table")]
    name: String,
    columns: Vec<ColumnDefinition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    primary_keys: Vec<String>,
}

impl TableDefinition {
    /// Creates a validated table definition.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found: an invalid table or
    /// column identifier, an empty column list, a duplicated primary key,
    /// or a primary key that names no column.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<ColumnDefinition>,
        primary_keys: Vec<String>,
    ) -> Result<Self, ValidationError> {
        let definition = Self {
            name: name.into(),
            columns,
            primary_keys,
        };
        crate::validate::validate_table(&definition)?;
        Ok(definition)
    }

    /// Starts a [`TableBuilder`] for the named table.
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            columns: Vec::new(),
            primary_keys: Vec::new(),
        }
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Primary-key columns in declaration order.
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// Looks up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns `true` if `column` is part of the primary key.
    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_keys.iter().any(|k| k == column)
    }
}

/// Builder for [`TableDefinition`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnDefinition>,
    primary_keys: Vec<String>,
}

impl TableBuilder {
    /// Appends a column.
    pub fn column(mut self, name: impl Into<String>, column_type: ColumnType) -> Self {
        self.columns.push(ColumnDefinition::new(name, column_type));
        self
    }

    /// Adds a column to the primary key.
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_keys.push(column.into());
        self
    }

    /// Validates and builds the definition.
    pub fn build(self) -> Result<TableDefinition, ValidationError> {
        TableDefinition::new(self.name, self.columns, self.primary_keys)
    }
}

#[derive(Deserialize)]
struct RawTableDefinition {
    #[serde(rename = "table")]
    name: String,
    columns: Vec<ColumnDefinition>,
    #[serde(default)]
    primary_keys: Vec<String>,
}

impl<'de> Deserialize<'de> for TableDefinition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawTableDefinition::deserialize(deserializer)?;
        TableDefinition::new(raw.name, raw.columns, raw.primary_keys)
            .map_err(serde::de::Error::custom)
    }
}

/// An immutable set of table definitions keyed by table id.
///
/// The id is the key used in the schema document; it usually, but not
/// necessarily, equals the table name. Iteration is ordered by id so that
/// applying a schema is deterministic.
///
/// # Examples
///
/// ```
/// use table_schema_core::{ColumnType, SchemaDefinition, TableDefinition};
///
/// let users = TableDefinition::builder("users")
///     .column("id", ColumnType::Integer)
///     .build()
///     .unwrap();
///
/// let schema = SchemaDefinition::new().with_table("users", users);
/// assert_eq!(schema.len(), 1);
/// assert!(schema.get("users").is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDefinition {
    tables: BTreeMap<String, TableDefinition>,
}

impl SchemaDefinition {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of this schema with `table` registered under `id`.
    pub fn with_table(mut self, id: impl Into<String>, table: TableDefinition) -> Self {
        self.tables.insert(id.into(), table);
        self
    }

    /// Looks up a table by id.
    pub fn get(&self, id: &str) -> Option<&TableDefinition> {
        self.tables.get(id)
    }

    /// Iterates `(id, table)` pairs in id order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableDefinition)> {
        self.tables.iter().map(|(id, table)| (id.as_str(), table))
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if the schema defines no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<(String, TableDefinition)> for SchemaDefinition {
    fn from_iter<I: IntoIterator<Item = (String, TableDefinition)>>(iter: I) -> Self {
        Self {
            tables: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> TableDefinition {
        TableDefinition::builder("players")
            .column("uuid", ColumnType::Integer)
            .column("name", ColumnType::Text)
            .primary_key("uuid")
            .build()
            .unwrap()
    }

    #[test]
    fn test_column_type_parse_is_case_insensitive() {
        assert_eq!("real".parse::<ColumnType>().unwrap(), ColumnType::Real);
        assert_eq!(" Blob ".parse::<ColumnType>().unwrap(), ColumnType::Blob);
        assert!("VARCHAR".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_null_type_has_no_declared_name() {
        assert_eq!(ColumnType::Null.declared_type(), "");
        assert!(ColumnType::Null.matches_declared(""));
        assert!(ColumnType::Text.matches_declared("text"));
        assert!(!ColumnType::Text.matches_declared("INTEGER"));
    }

    #[test]
    fn test_builder_keeps_column_order() {
        let table = players();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["uuid", "name"]);
        assert_eq!(table.primary_keys(), ["uuid".to_string()]);
        assert_eq!(table.column("name").unwrap().column_type, ColumnType::Text);
    }

    #[test]
    fn test_primary_key_must_name_a_column() {
        let err = TableDefinition::builder("players")
            .column("uuid", ColumnType::Integer)
            .primary_key("id")
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::UnknownPrimaryKey("id".into()));
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{"table":"t","columns":[{"name":"a","type":"TEXT"}],"primary_keys":["b"]}"#;
        assert!(serde_json::from_str::<TableDefinition>(json).is_err());

        let json = r#"{"table":"t","columns":[{"name":"a","type":"TEXT"}]}"#;
        let table: TableDefinition = serde_json::from_str(json).unwrap();
        assert!(table.primary_keys().is_empty());
    }

    #[test]
    fn test_serializes_in_document_shape() {
        let value = serde_json::to_value(players()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "table": "players",
                "columns": [
                    {"name": "uuid", "type": "INTEGER"},
                    {"name": "name", "type": "TEXT"}
                ],
                "primary_keys": ["uuid"]
            })
        );
    }

    #[test]
    fn test_schema_iterates_in_id_order() {
        let schema = SchemaDefinition::new()
            .with_table("zeta", players())
            .with_table("alpha", players());
        let ids: Vec<&str> = schema.tables().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }
}
