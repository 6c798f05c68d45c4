//! Schema document loading.
//!
//! A schema document maps a table id to a table entry:
//!
//! ```json
//! {
//!   "players": {
//!     "table": "players",
//!     "columns": [
//!       { "name": "uuid", "type": "INTEGER" },
//!       { "name": "name", "type": "TEXT" }
//!     ],
//!     "primary_keys": ["uuid"]
//!   }
//! }
//! ```
//!
//! The same shape is accepted as YAML. [`SchemaDocument`] holds the decoded
//! form; [`SchemaDocument::into_definition`] validates it into an immutable
//! [`SchemaDefinition`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use table_schema_core::{ColumnDefinition, ColumnType, SchemaDefinition, TableDefinition};
use tracing::{debug, info, warn};

use crate::error::{DocumentError, Result};

/// Serialization format of a schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// JSON (the default).
    Json,
    /// YAML.
    Yaml,
}

impl DocumentFormat {
    /// Picks the format from a file extension; anything other than
    /// `yaml`/`yml` is treated as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DocumentFormat::Yaml
            }
            _ => DocumentFormat::Json,
        }
    }
}

/// One column entry as written in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnEntry {
    /// Column name.
    pub name: String,
    /// Type name, matched case-insensitively against the storage classes.
    #[serde(rename = "type")]
    pub column_type: String,
}

/// One table entry as written in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    /// Name of the table in the store.
    pub table: String,
    /// Columns in creation order.
    pub columns: Vec<ColumnEntry>,
    /// Primary-key columns; absent means no primary key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_keys: Vec<String>,
}

impl TableEntry {
    fn to_definition(&self) -> std::result::Result<TableDefinition, table_schema_core::ValidationError> {
        let columns = self
            .columns
            .iter()
            .map(|c| Ok(ColumnDefinition::new(&c.name, c.column_type.parse::<ColumnType>()?)))
            .collect::<std::result::Result<Vec<_>, table_schema_core::ValidationError>>()?;
        TableDefinition::new(&self.table, columns, self.primary_keys.clone())
    }
}

/// A decoded, not yet validated, schema document.
///
/// # Examples
///
/// ```
/// use table_schema_db::SchemaDocument;
///
/// let doc = SchemaDocument::from_yaml_str(r#"
/// players:
///   table: players
///   columns:
///     - { name: uuid, type: INTEGER }
///     - { name: name, type: text }
///   primary_keys: [uuid]
/// "#).unwrap();
///
/// let schema = doc.into_definition().unwrap();
/// assert_eq!(schema.get("players").unwrap().columns().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDocument {
    tables: BTreeMap<String, TableEntry>,
}

impl SchemaDocument {
    /// Parses a JSON document. Blank input yields an empty document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a YAML document. Blank input yields an empty document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parses a document in the given format.
    pub fn parse(content: &str, format: DocumentFormat) -> Result<Self> {
        match format {
            DocumentFormat::Json => Self::from_json_str(content),
            DocumentFormat::Yaml => Self::from_yaml_str(content),
        }
    }

    /// Reads and parses a document, choosing the format by extension.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::IoError`] if the file cannot be read, or a
    /// JSON/YAML error if it is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let doc = Self::parse(&content, DocumentFormat::from_path(path))?;
        debug!(path = %path.display(), tables = doc.len(), "read schema document");
        Ok(doc)
    }

    /// Loads a document from `path`, initialising it when absent.
    ///
    /// A missing file is created empty (parent directories included) and an
    /// empty file is accepted as-is; both yield an empty schema and log a
    /// warning so the operator knows to fill it in. Anything else is parsed
    /// and validated.
    ///
    /// # Errors
    ///
    /// Malformed content, an invalid table entry, or an I/O failure while
    /// reading or creating the file.
    pub fn load_or_init(path: impl AsRef<Path>) -> Result<SchemaDefinition> {
        let path = path.as_ref();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path)?;
            warn!(path = %path.display(), "schema file created; add a schema and reload");
            return Ok(SchemaDefinition::new());
        }

        let doc = Self::from_path(path)?;
        if doc.is_empty() {
            warn!(path = %path.display(), "schema file is empty; add a schema and reload");
            return Ok(SchemaDefinition::new());
        }

        let schema = doc.into_definition()?;
        info!(path = %path.display(), tables = schema.len(), "schema loaded");
        Ok(schema)
    }

    /// Inserts or replaces a table entry.
    pub fn insert(&mut self, table_id: impl Into<String>, entry: TableEntry) {
        self.tables.insert(table_id.into(), entry);
    }

    /// Looks up a table entry by id.
    pub fn get(&self, table_id: &str) -> Option<&TableEntry> {
        self.tables.get(table_id)
    }

    /// Number of table entries.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns `true` if the document has no table entries.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Validates every entry and produces an immutable [`SchemaDefinition`].
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::InvalidTable`] for the first entry (in id
    /// order) that fails validation.
    pub fn into_definition(self) -> Result<SchemaDefinition> {
        self.tables
            .into_iter()
            .map(|(table_id, entry)| match entry.to_definition() {
                Ok(definition) => Ok((table_id, definition)),
                Err(source) => Err(DocumentError::InvalidTable { table_id, source }),
            })
            .collect()
    }

    /// Serializes the document as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<&SchemaDefinition> for SchemaDocument {
    fn from(schema: &SchemaDefinition) -> Self {
        let tables = schema
            .tables()
            .map(|(id, table)| {
                let entry = TableEntry {
                    table: table.name().to_string(),
                    columns: table
                        .columns()
                        .iter()
                        .map(|c| ColumnEntry {
                            name: c.name.clone(),
                            column_type: c.column_type.to_string(),
                        })
                        .collect(),
                    primary_keys: table.primary_keys().to_vec(),
                };
                (id.to_string(), entry)
            })
            .collect();
        Self { tables }
    }
}
