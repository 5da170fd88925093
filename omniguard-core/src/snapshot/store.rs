//! Content-addressed pre-image storage.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use omniguard_config::SnapshotConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::SnapshotKey;
use super::vcs::{GitCli, VersionControl};
use crate::utils::fs::{read_json, write_atomic, write_json_atomic};

const BLOB_EXTENSION: &str = "snap";

/// Index entry describing one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SnapshotRecord {
    /// Bytes copied to `<hash>.snap`.
    #[serde(rename = "file")]
    ContentAddressed {
        file_path: String,
        size: u64,
        created_at: DateTime<Utc>,
    },
    /// Committed object in the file's repository; nothing copied.
    #[serde(rename = "git_blob")]
    VersionControlBlob {
        blob_ref: String,
        file_path: String,
        created_at: DateTime<Utc>,
    },
}

impl SnapshotRecord {
    pub fn file_path(&self) -> &str {
        match self {
            Self::ContentAddressed { file_path, .. }
            | Self::VersionControlBlob { file_path, .. } => file_path,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::ContentAddressed { created_at, .. }
            | Self::VersionControlBlob { created_at, .. } => *created_at,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotIndex {
    #[serde(default)]
    pub snapshots: BTreeMap<String, SnapshotRecord>,
}

/// Outcome of a [`SnapshotStore::reclaim`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reclaimed {
    pub entries: usize,
    pub blobs: usize,
}

/// Snapshot directory with its `index.json` and `<hash>.snap` blobs.
#[derive(Debug, Clone)]
pub struct SnapshotStore<V: VersionControl = GitCli> {
    dir: PathBuf,
    config: SnapshotConfig,
    vcs: V,
}

impl SnapshotStore<GitCli> {
    pub fn with_git(dir: impl Into<PathBuf>, config: SnapshotConfig) -> Self {
        let vcs = GitCli::new(config.vcs_timeout());
        Self::new(dir, config, vcs)
    }
}

impl<V: VersionControl> SnapshotStore<V> {
    pub fn new(dir: impl Into<PathBuf>, config: SnapshotConfig, vcs: V) -> Self {
        Self {
            dir: dir.into(),
            config,
            vcs,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn index_file(&self) -> PathBuf {
        self.dir.join(omniguard_config::constants::SNAPSHOT_INDEX_FILE_NAME)
    }

    fn blob_file(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.{BLOB_EXTENSION}"))
    }

    /// Current index. A corrupt index reads as empty and is overwritten by
    /// the next save.
    pub fn load_index(&self) -> SnapshotIndex {
        match read_json(&self.index_file()) {
            Ok(index) => index.unwrap_or_default(),
            Err(error) => {
                warn!(error = %format!("{error:#}"), "replacing corrupt snapshot index");
                SnapshotIndex::default()
            }
        }
    }

    fn save_index(&self, index: &SnapshotIndex) -> Result<()> {
        write_json_atomic(&self.index_file(), index)
    }

    pub fn record(&self, key: &SnapshotKey) -> Option<SnapshotRecord> {
        self.load_index().snapshots.remove(&key.to_string())
    }

    /// Capture the current content of `path` before it is modified.
    ///
    /// Returns `None` for missing files, non-regular files and files above
    /// the size limit.
    pub fn capture(&self, path: &Path, now: DateTime<Utc>) -> Result<Option<SnapshotKey>> {
        let Ok(metadata) = fs::metadata(path) else {
            return Ok(None);
        };
        if !metadata.is_file() || metadata.len() > self.config.max_file_size {
            debug!(path = %path.display(), size = metadata.len(), "skipping snapshot");
            return Ok(None);
        }
        let resolved = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .into_owned();

        if let Some(blob_ref) = self.committed_blob(path) {
            let key = SnapshotKey::VersionControl(blob_ref.clone());
            let mut index = self.load_index();
            index.snapshots.insert(
                key.to_string(),
                SnapshotRecord::VersionControlBlob {
                    blob_ref,
                    file_path: resolved,
                    created_at: now,
                },
            );
            self.save_index(&index)?;
            return Ok(Some(key));
        }

        let data = fs::read(path)
            .with_context(|| format!("Failed to read {} for snapshot", path.display()))?;
        let hash = format!("{:x}", Sha256::digest(&data));
        let blob = self.blob_file(&hash);
        if !blob.exists() {
            write_atomic(&blob, &data)?;
        }

        let mut index = self.load_index();
        index.snapshots.insert(
            hash.clone(),
            SnapshotRecord::ContentAddressed {
                file_path: resolved,
                size: data.len() as u64,
                created_at: now,
            },
        );
        self.save_index(&index)?;
        debug!(path = %path.display(), %hash, "captured snapshot");
        Ok(Some(SnapshotKey::Content(hash)))
    }

    /// Version-control failures fall back to copying the bytes.
    fn committed_blob(&self, path: &Path) -> Option<String> {
        match self.vcs.is_tracked(path) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(error) => {
                debug!(%error, "version control unavailable");
                return None;
            }
        }
        self.vcs
            .blob_ref(path)
            .inspect_err(|error| debug!(%error, "could not resolve committed blob"))
            .ok()
            .flatten()
    }

    /// Bytes stored under `key`, or `None` when they are gone.
    pub fn retrieve(&self, key: &SnapshotKey) -> Result<Option<Vec<u8>>> {
        match key {
            SnapshotKey::VersionControl(blob_ref) => {
                let cwd = self.record(key).and_then(|record| {
                    Path::new(record.file_path())
                        .parent()
                        .map(Path::to_path_buf)
                });
                match self.vcs.cat_blob(blob_ref, cwd.as_deref()) {
                    Ok(bytes) => Ok(Some(bytes)),
                    Err(error) => {
                        debug!(%error, %blob_ref, "could not read committed blob");
                        Ok(None)
                    }
                }
            }
            SnapshotKey::Content(hash) => {
                let blob = self.blob_file(hash);
                if !blob.exists() {
                    return Ok(None);
                }
                let bytes = fs::read(&blob)
                    .with_context(|| format!("Failed to read snapshot {}", blob.display()))?;
                Ok(Some(bytes))
            }
        }
    }

    /// Drop expired index entries, then delete blobs no live entry refers to.
    pub fn reclaim(&self, now: DateTime<Utc>) -> Result<Reclaimed> {
        if !self.dir.exists() {
            return Ok(Reclaimed::default());
        }
        let expiry = i64::try_from(self.config.expiry_days)
            .ok()
            .and_then(Duration::try_days)
            .unwrap_or(Duration::MAX);

        let mut index = self.load_index();
        let before = index.snapshots.len();
        index
            .snapshots
            .retain(|_, record| now - record.created_at() <= expiry);
        let mut reclaimed = Reclaimed {
            entries: before - index.snapshots.len(),
            blobs: 0,
        };
        self.save_index(&index)?;

        let live: HashSet<&str> = index
            .snapshots
            .iter()
            .filter(|(_, record)| matches!(record, SnapshotRecord::ContentAddressed { .. }))
            .map(|(key, _)| key.as_str())
            .collect();

        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != BLOB_EXTENSION) {
                continue;
            }
            let referenced = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| live.contains(stem));
            if !referenced && fs::remove_file(&path).is_ok() {
                reclaimed.blobs += 1;
            }
        }

        debug!(
            entries = reclaimed.entries,
            blobs = reclaimed.blobs,
            "reclaimed snapshots"
        );
        Ok(reclaimed)
    }
}
