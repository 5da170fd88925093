//! Hand-off of snapshot keys from the guard pass to the tracker pass.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::SnapshotKey;
use crate::utils::fs::{read_json, write_json_atomic};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSnapshot {
    #[serde(rename = "snapshot_hash")]
    pub snapshot_key: SnapshotKey,
    pub file_path: String,
    pub tool: String,
}

/// One file per tool + path pairing. A later guard pass for the same pairing
/// overwrites an unconsumed entry.
#[derive(Debug, Clone)]
pub struct PendingSnapshots {
    dir: PathBuf,
}

impl PendingSnapshots {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_file(&self, tool: &str, file_path: &str) -> PathBuf {
        let digest = Sha256::digest(format!("{tool}:{file_path}").as_bytes());
        self.dir.join(format!("{digest:x}.json"))
    }

    pub fn put(&self, pending: &PendingSnapshot) -> Result<()> {
        write_json_atomic(&self.entry_file(&pending.tool, &pending.file_path), pending)
    }

    /// Read and delete the entry for this pairing.
    pub fn take(&self, tool: &str, file_path: &str) -> Result<Option<PendingSnapshot>> {
        let path = self.entry_file(tool, file_path);
        let pending = read_json::<PendingSnapshot>(&path);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("Failed to remove {}", path.display()));
            }
        }
        pending
    }
}
