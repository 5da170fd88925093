//! Rollback registry
//!
//! Append-only log of completed tool calls with enough detail for an
//! external tool to undo reversible ones. Capped to the most recent
//! entries; older unversioned documents are upgraded on load.

pub mod migration;
pub mod operation;
pub mod store;

use anyhow::Result;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::snapshot::SnapshotKey;
use crate::tool::ToolInvocation;

pub use operation::{MIGRATED_SESSION_ID, Operation, OperationDetails};
pub use store::{FileRegistryStore, RegistryDocument, RegistryStore, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no operation with id {0}")]
    UnknownOperation(Uuid),

    #[error("operation {0} was already rolled back")]
    AlreadyRolledBack(Uuid),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub struct RollbackRegistry<S: RegistryStore> {
    store: S,
    max_entries: usize,
}

impl<S: RegistryStore> RollbackRegistry<S> {
    pub fn new(store: S, max_entries: usize) -> Self {
        Self { store, max_entries }
    }

    /// Current document. A missing or unparseable file reads as empty; an
    /// older schema is upgraded and written back first. Entries of a current
    /// document that do not match the typed layout are kept as legacy
    /// entries.
    pub fn load(&self) -> RegistryDocument {
        let raw = match self.store.load_raw() {
            Ok(Some(raw)) => raw,
            Ok(None) => return RegistryDocument::default(),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "discarding unreadable rollback registry");
                return RegistryDocument::default();
            }
        };

        if migration::document_version(&raw) < u64::from(SCHEMA_VERSION) {
            let mut document = migration::migrate_v1(&raw);
            self.truncate(&mut document);
            if let Err(error) = self.store.save(&document) {
                warn!(error = %format!("{error:#}"), "failed to persist migrated registry");
            }
            return document;
        }

        RegistryDocument::from_value(&raw)
    }

    fn truncate(&self, document: &mut RegistryDocument) {
        let len = document.operations.len();
        if len > self.max_entries {
            document.operations.drain(..len - self.max_entries);
        }
        document.version = SCHEMA_VERSION;
    }

    /// Record a completed invocation and return the stored entry.
    pub fn append(
        &self,
        invocation: &ToolInvocation,
        session_id: &str,
        snapshot_key: Option<SnapshotKey>,
        now: DateTime<Utc>,
    ) -> Result<Operation> {
        let operation = Operation::from_invocation(invocation, session_id, snapshot_key, now);
        let mut document = self.load();
        document.operations.push(operation.clone());
        self.truncate(&mut document);
        self.store.save(&document)?;
        debug!(id = %operation.id, tool = %operation.tool, "appended operation");
        Ok(operation)
    }

    pub fn find(&self, id: Uuid) -> Option<Operation> {
        self.load().operations.into_iter().find(|op| op.id == id)
    }

    /// Entries of one session, oldest first.
    pub fn for_session(&self, session_id: &str) -> Vec<Operation> {
        self.load()
            .operations
            .into_iter()
            .filter(|op| op.session_id == session_id)
            .collect()
    }

    /// Flag an entry as undone by an external tool.
    pub fn mark_rolled_back(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Operation, RegistryError> {
        let mut document = self.load();
        let operation = document
            .operations
            .iter_mut()
            .find(|op| op.id == id)
            .ok_or(RegistryError::UnknownOperation(id))?;
        if operation.rolled_back {
            return Err(RegistryError::AlreadyRolledBack(id));
        }
        operation.rolled_back = true;
        operation.rolled_back_at = Some(operation::format_timestamp(now));
        let updated = operation.clone();
        self.store.save(&document)?;
        Ok(updated)
    }
}
