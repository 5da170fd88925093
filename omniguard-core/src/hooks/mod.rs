//! Hook entry points
//!
//! [`GuardHook`] runs before a tool call and decides whether it may proceed.
//! [`TrackerHook`] runs after it and appends the call to the rollback
//! registry. Both share a [`HookContext`] describing where state lives.

pub mod guard;
pub mod request;
pub mod response;
pub mod status;
pub mod tracker;

use std::path::PathBuf;

use anyhow::Result;
use omniguard_config::{DataPaths, GuardConfig, load_config, resolve_session_id};
use tracing::warn;

use crate::command_safety::Normalizer;
use crate::registry::{FileRegistryStore, RollbackRegistry};
use crate::risk::FileSessionStore;
use crate::snapshot::PendingSnapshots;

pub use guard::GuardHook;
pub use request::HookRequest;
pub use response::{GuardResponse, HookSpecificOutput, PermissionDecision};
pub use status::StatusReport;
pub use tracker::TrackerHook;

/// Per-process environment shared by the hooks.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub paths: DataPaths,
    pub config: GuardConfig,
    pub session_id: String,
    pub home: PathBuf,
}

impl HookContext {
    pub fn new(
        paths: DataPaths,
        config: GuardConfig,
        session_id: impl Into<String>,
        home: impl Into<PathBuf>,
    ) -> Self {
        Self {
            paths,
            config,
            session_id: session_id.into(),
            home: home.into(),
        }
    }

    /// Resolve paths, configuration and session identity from the
    /// environment, creating the data directories.
    pub fn discover() -> Result<Self> {
        let paths = DataPaths::discover()?;
        if let Err(error) = paths.ensure_dirs() {
            warn!(error = %format!("{error:#}"), "could not create data directories");
        }
        let config = load_config(&paths);
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        Ok(Self::new(paths, config, resolve_session_id(), home))
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(&self.home)
    }

    pub fn session_store(&self) -> FileSessionStore {
        FileSessionStore::new(self.paths.sessions_dir())
    }

    pub fn pending_snapshots(&self) -> PendingSnapshots {
        PendingSnapshots::new(self.paths.pending_dir())
    }

    pub fn registry(&self) -> RollbackRegistry<FileRegistryStore> {
        RollbackRegistry::new(
            FileRegistryStore::new(self.paths.registry_file()),
            self.config.registry.max_entries,
        )
    }
}
