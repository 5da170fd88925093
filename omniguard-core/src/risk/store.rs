//! Session state persistence.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

use super::session::SessionState;
use crate::utils::fs::{read_json, write_json_atomic};

/// Storage for [`SessionState`]. Concurrent writers are not serialized; the
/// last save wins.
pub trait SessionStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionState>>;

    fn save(&self, state: &SessionState) -> Result<()>;

    /// Remove sessions untouched for longer than `max_age`. Returns how many
    /// were removed.
    fn purge_stale(&self, now: DateTime<Utc>, max_age: Duration) -> Result<usize>;
}

/// One JSON file per session under a directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn session_file(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_session_id(session_id)))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, session_id: &str) -> Result<Option<SessionState>> {
        read_json(&self.session_file(session_id))
    }

    fn save(&self, state: &SessionState) -> Result<()> {
        write_json_atomic(&self.session_file(&state.session_id), state)
    }

    fn purge_stale(&self, now: DateTime<Utc>, max_age: Duration) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let now = SystemTime::from(now);
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Ok(modified) = entry.metadata().and_then(|meta| meta.modified()) else {
                continue;
            };
            let stale = now
                .duration_since(modified)
                .is_ok_and(|age| age > max_age);
            if stale && fs::remove_file(&path).is_ok() {
                debug!(path = %path.display(), "removed stale session");
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Restrict a session id to `[A-Za-z0-9_.-]` so it is safe as a file name.
pub fn sanitize_session_id(session_id: &str) -> String {
    let sanitized: String = session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        format!("_{sanitized}")
    } else {
        sanitized
    }
}
