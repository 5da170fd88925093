//! Registry persistence.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::operation::Operation;
use crate::utils::fs::{read_json, write_json_atomic};

pub const SCHEMA_VERSION: u32 = 2;

/// The persisted registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryDocument {
    pub version: u32,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl RegistryDocument {
    /// Read a current-schema document entry by entry, so one foreign or
    /// damaged entry never costs the rest.
    pub fn from_value(raw: &Value) -> Self {
        let operations = raw
            .get("operations")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(Operation::from_stored).collect())
            .unwrap_or_default();
        Self {
            version: SCHEMA_VERSION,
            operations,
        }
    }
}

impl Default for RegistryDocument {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            operations: Vec::new(),
        }
    }
}

/// Raw storage behind [`super::RollbackRegistry`]. Documents are handed over
/// untyped so older schema versions can be upgraded. Last writer wins.
pub trait RegistryStore {
    fn load_raw(&self) -> Result<Option<Value>>;

    fn save(&self, document: &RegistryDocument) -> Result<()>;
}

/// `rollback_registry.json` in the data directory.
#[derive(Debug, Clone)]
pub struct FileRegistryStore {
    path: PathBuf,
}

impl FileRegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RegistryStore for FileRegistryStore {
    fn load_raw(&self) -> Result<Option<Value>> {
        read_json(&self.path)
    }

    fn save(&self, document: &RegistryDocument) -> Result<()> {
        write_json_atomic(&self.path, document)
    }
}
