//! Store configuration.
//!
//! Describes how the SQLite file backing a store is opened. Loaded from YAML
//! so it can sit next to the schema document.
//!
//! # Example YAML
//!
//! ```yaml
//! path: plugins/minigame/data.db
//! busy_timeout_ms: 2000
//! foreign_keys: true
//! create_parent_dirs: true
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocumentError, Result};

/// Default busy timeout for store connections.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Settings used to open a store.
///
/// # Examples
///
/// ```
/// use table_schema_db::StoreConfig;
///
/// let config = StoreConfig::from_yaml_str("path: data.db").unwrap();
/// assert_eq!(config.busy_timeout_ms, 5_000);
/// assert!(!config.foreign_keys);
/// assert!(config.create_parent_dirs);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
    /// How long a statement waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Enables `PRAGMA foreign_keys` on open.
    #[serde(default)]
    pub foreign_keys: bool,
    /// Creates missing parent directories of `path` before opening.
    #[serde(default = "default_create_parent_dirs")]
    pub create_parent_dirs: bool,
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

const fn default_create_parent_dirs() -> bool {
    true
}

impl StoreConfig {
    /// Creates a configuration for `path` with default settings.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: false,
            create_parent_dirs: true,
        }
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](DocumentError::IoError) if the file cannot be
    /// read, [`YamlError`](DocumentError::YamlError) if parsing fails, or
    /// [`InvalidConfig`](DocumentError::InvalidConfig) if a value is out of
    /// range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Busy timeout as a [`Duration`].
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(DocumentError::InvalidConfig(
                "path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
