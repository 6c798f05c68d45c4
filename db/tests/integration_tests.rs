use std::io::Write;

use table_schema_core::{ColumnType, SchemaDefinition};
use table_schema_db::{DocumentError, SchemaDocument, StoreConfig};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SCHEMA_JSON: &str = r#"{
    "test_table": {
        "table": "test_table",
        "columns": [
            {"name": "uuid", "type": "INTEGER"},
            {"name": "name", "type": "TEXT"},
            {"name": "progress", "type": "REAL"}
        ],
        "primary_keys": ["uuid"]
    }
}"#;

const SCHEMA_YAML: &str = r#"
test_table:
  table: test_table
  columns:
    - name: uuid
      type: INTEGER
    - name: name
      type: TEXT
    - name: progress
      type: REAL
  primary_keys: [uuid]
"#;

fn write_file(path: &std::path::Path, content: &str) {
    let mut f = std::fs::File::create(path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.flush().unwrap();
}

// ---------------------------------------------------------------------------
// Document loading
// ---------------------------------------------------------------------------

#[test]
fn test_json_and_yaml_decode_to_same_definition() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("schema.json");
    let yaml_path = dir.path().join("schema.yml");
    write_file(&json_path, SCHEMA_JSON);
    write_file(&yaml_path, SCHEMA_YAML);

    let from_json = SchemaDocument::from_path(&json_path)
        .unwrap()
        .into_definition()
        .unwrap();
    let from_yaml = SchemaDocument::from_path(&yaml_path)
        .unwrap()
        .into_definition()
        .unwrap();
    assert_eq!(from_json, from_yaml);

    let table = from_json.get("test_table").unwrap();
    assert_eq!(table.name(), "test_table");
    assert_eq!(table.column("uuid").unwrap().column_type, ColumnType::Integer);
}

#[test]
fn test_definition_serializes_as_document() {
    let definition = SchemaDocument::from_json_str(SCHEMA_JSON)
        .unwrap()
        .into_definition()
        .unwrap();

    let json = serde_json::to_string(&definition).unwrap();
    let reread = SchemaDocument::from_json_str(&json)
        .unwrap()
        .into_definition()
        .unwrap();
    assert_eq!(reread, definition);

    let direct: SchemaDefinition = serde_json::from_str(SCHEMA_JSON).unwrap();
    assert_eq!(direct, definition);
}

#[test]
fn test_load_or_init_creates_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("schema_default.json");

    let schema = SchemaDocument::load_or_init(&path).unwrap();
    assert!(schema.is_empty());
    assert!(path.exists());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");

    // Second load sees the (still empty) file and stays empty.
    assert!(SchemaDocument::load_or_init(&path).unwrap().is_empty());
}

#[test]
fn test_load_or_init_reads_existing_schema() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema_default.json");
    write_file(&path, SCHEMA_JSON);

    let schema = SchemaDocument::load_or_init(&path).unwrap();
    assert_eq!(schema.len(), 1);
    assert_eq!(schema.get("test_table").unwrap().primary_keys(), ["uuid".to_string()]);
}

#[test]
fn test_load_or_init_malformed_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema_default.json");
    write_file(&path, "{\"t\": {\"table\": \"t\"");

    let err = SchemaDocument::load_or_init(&path).unwrap_err();
    assert!(matches!(err, DocumentError::JsonError(_)));
}

#[test]
fn test_load_or_init_invalid_primary_key_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    write_file(
        &path,
        r#"{"t": {"table": "t", "columns": [{"name": "a", "type": "TEXT"}], "primary_keys": ["b"]}}"#,
    );

    let err = SchemaDocument::load_or_init(&path).unwrap_err();
    assert!(matches!(err, DocumentError::InvalidTable { .. }));
}

// ---------------------------------------------------------------------------
// Store configuration
// ---------------------------------------------------------------------------

#[test]
fn test_store_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.yaml");
    write_file(&path, "path: data/data.db\nforeign_keys: true\n");

    let config = StoreConfig::load(&path).unwrap();
    assert_eq!(config.path, std::path::PathBuf::from("data/data.db"));
    assert!(config.foreign_keys);
    assert_eq!(config.busy_timeout_ms, table_schema_db::DEFAULT_BUSY_TIMEOUT_MS);
}
