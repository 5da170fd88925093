//! Schema upgrades for the registry document.

use serde_json::Value;
use tracing::info;

use super::operation::Operation;
use super::store::{RegistryDocument, SCHEMA_VERSION};

/// Schema version of a raw document. Documents without one predate
/// versioning and count as version 1.
pub fn document_version(raw: &Value) -> u64 {
    raw.get("version").and_then(Value::as_u64).unwrap_or(1)
}

/// Upgrade an unversioned document. Every entry gets a fresh id and the
/// `migrated` session; its details are kept verbatim.
pub fn migrate_v1(raw: &Value) -> RegistryDocument {
    let operations: Vec<Operation> = raw
        .get("operations")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(Operation::from_legacy).collect())
        .unwrap_or_default();
    info!(
        operations = operations.len(),
        to = SCHEMA_VERSION,
        "migrated rollback registry"
    );
    RegistryDocument {
        version: SCHEMA_VERSION,
        operations,
    }
}
