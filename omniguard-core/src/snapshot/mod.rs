//! Pre-modification snapshots
//!
//! Before an allowed file modification the guard captures the file's current
//! bytes. Files committed to a git repository are referenced by their blob id
//! (`git:<ref>`); everything else is copied once per distinct content into
//! `<sha256>.snap`. The resulting key reaches the tracker pass through
//! [`PendingSnapshots`].

pub mod pending;
pub mod store;
pub mod vcs;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use pending::{PendingSnapshot, PendingSnapshots};
pub use store::{Reclaimed, SnapshotIndex, SnapshotRecord, SnapshotStore};
pub use vcs::{GitCli, VcsError, VersionControl};

const VCS_KEY_PREFIX: &str = "git:";

/// Address of a stored pre-image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SnapshotKey {
    /// Lowercase hex SHA-256 of the captured bytes.
    Content(String),
    /// Committed blob id.
    VersionControl(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid snapshot key `{0}`")]
pub struct InvalidSnapshotKey(pub String);

impl FromStr for SnapshotKey {
    type Err = InvalidSnapshotKey;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if let Some(blob_ref) = raw.strip_prefix(VCS_KEY_PREFIX) {
            if !blob_ref.is_empty() && blob_ref.chars().all(|c| c.is_ascii_hexdigit()) {
                return Ok(Self::VersionControl(blob_ref.to_string()));
            }
        } else if raw.len() == 64 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(Self::Content(raw.to_ascii_lowercase()));
        }
        Err(InvalidSnapshotKey(raw.to_string()))
    }
}

impl TryFrom<String> for SnapshotKey {
    type Error = InvalidSnapshotKey;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<SnapshotKey> for String {
    fn from(key: SnapshotKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Content(hash) => f.write_str(hash),
            Self::VersionControl(blob_ref) => write!(f, "{VCS_KEY_PREFIX}{blob_ref}"),
        }
    }
}
