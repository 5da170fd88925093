//! Well-known on-disk layout shared by every hook process.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_DATA_DIR, HOME_ENV, PENDING_DIR_NAME, REGISTRY_FILE_NAME,
    SESSION_ID_ENV, SESSIONS_DIR_NAME, SNAPSHOT_INDEX_FILE_NAME, SNAPSHOTS_DIR_NAME,
};

/// Locations of the registry, session, snapshot and pending files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the data directory from `OMNIGUARD_HOME`, falling back to
    /// `~/.claude/omni-agent`.
    pub fn discover() -> Result<Self> {
        if let Ok(custom) = std::env::var(HOME_ENV) {
            let trimmed = custom.trim();
            if !trimmed.is_empty() {
                return Ok(Self::new(trimmed));
            }
        }

        let home = dirs::home_dir().context("Cannot determine home directory")?;
        let root = DEFAULT_DATA_DIR
            .iter()
            .fold(home, |path, segment| path.join(segment));
        Ok(Self::new(root))
    }

    /// Create every directory the hooks write into.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.sessions_dir(),
            self.snapshots_dir(),
            self.pending_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn registry_file(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE_NAME)
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join(SESSIONS_DIR_NAME)
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join(SNAPSHOTS_DIR_NAME)
    }

    pub fn snapshot_index_file(&self) -> PathBuf {
        self.snapshots_dir().join(SNAPSHOT_INDEX_FILE_NAME)
    }

    pub fn pending_dir(&self) -> PathBuf {
        self.root.join(PENDING_DIR_NAME)
    }
}

/// Session identifier from `CLAUDE_SESSION_ID`, or the parent process id
/// when the agent did not export one.
pub fn resolve_session_id() -> String {
    std::env::var(SESSION_ID_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(parent_process_id)
}

#[cfg(unix)]
fn parent_process_id() -> String {
    std::os::unix::process::parent_id().to_string()
}

#[cfg(not(unix))]
fn parent_process_id() -> String {
    std::process::id().to_string()
}
