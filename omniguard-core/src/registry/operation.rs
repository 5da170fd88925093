//! Registry entries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::snapshot::SnapshotKey;
use crate::tool::{MultiFileEdit, ToolInvocation};
use crate::utils::text::truncate_with_ellipsis;

const EDIT_PREVIEW_CHARS: usize = 100;
const COMMAND_PREVIEW_CHARS: usize = 200;
const PROMPT_PREVIEW_CHARS: usize = 200;
const MULTI_EDIT_FILES_LISTED: usize = 5;
const CONTENT_HASH_CHARS: usize = 16;

/// Session id assigned to entries upgraded from the unversioned format.
pub const MIGRATED_SESSION_ID: &str = "migrated";

/// A completed tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: Uuid,
    pub session_id: String,
    /// RFC 3339, or whatever an upgraded entry carried.
    pub timestamp: String,
    pub tool: String,
    pub reversible: bool,
    pub details: OperationDetails,
    #[serde(default)]
    pub rolled_back: bool,
    #[serde(default)]
    pub rolled_back_at: Option<String>,
    #[serde(default, rename = "snapshot_hash")]
    pub snapshot_key: Option<SnapshotKey>,
}

/// What was done, summarized per tool kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationDetails {
    FileWrite {
        file_path: String,
        /// First 16 hex characters of the SHA-256 of the written content.
        content_hash: String,
        content_length: usize,
    },
    FileEdit {
        file_path: String,
        old_string: String,
        new_string: String,
    },
    ShellCommand {
        command: String,
    },
    MultiFileEdit {
        file_count: usize,
        files: Vec<String>,
    },
    NotebookEdit {
        notebook_path: String,
        edit_mode: String,
        cell_type: String,
    },
    AgentDelegation {
        prompt_preview: String,
        subagent_type: String,
    },
    /// Unversioned payload kept as found.
    Legacy {
        raw: Value,
    },
}

impl Operation {
    pub fn from_invocation(
        invocation: &ToolInvocation,
        session_id: &str,
        snapshot_key: Option<SnapshotKey>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            timestamp: format_timestamp(now),
            tool: invocation.kind().tool_name().to_string(),
            reversible: is_reversible(invocation),
            details: OperationDetails::from_invocation(invocation),
            rolled_back: false,
            rolled_back_at: None,
            snapshot_key,
        }
    }

    /// Wrap an unversioned entry. Missing fields fall back to empty values.
    pub fn from_legacy(entry: &Value) -> Self {
        let text = |field: &str| {
            entry
                .get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            id: Uuid::new_v4(),
            session_id: MIGRATED_SESSION_ID.to_string(),
            timestamp: text("timestamp"),
            tool: text("tool"),
            reversible: entry
                .get("reversible")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            details: OperationDetails::Legacy {
                raw: entry
                    .get("details")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Default::default())),
            },
            rolled_back: false,
            rolled_back_at: None,
            snapshot_key: None,
        }
    }

    /// Read one entry of a current-schema document. An entry that does not
    /// match the typed layout keeps whatever identity fields it carries and
    /// its details verbatim as [`OperationDetails::Legacy`].
    pub fn from_stored(entry: &Value) -> Self {
        if let Ok(operation) = serde_json::from_value::<Self>(entry.clone()) {
            return operation;
        }
        let text = |field: &str| entry.get(field).and_then(Value::as_str).map(str::to_string);
        let flag = |field: &str| entry.get(field).and_then(Value::as_bool).unwrap_or(false);
        let details = match entry.get("details") {
            Some(raw) => serde_json::from_value(raw.clone())
                .unwrap_or_else(|_| OperationDetails::Legacy { raw: raw.clone() }),
            None => OperationDetails::Legacy {
                raw: Value::Object(Default::default()),
            },
        };
        Self {
            id: text("id")
                .and_then(|id| Uuid::parse_str(&id).ok())
                .unwrap_or_else(Uuid::new_v4),
            session_id: text("session_id").unwrap_or_else(|| MIGRATED_SESSION_ID.to_string()),
            timestamp: text("timestamp").unwrap_or_default(),
            tool: text("tool").unwrap_or_default(),
            reversible: flag("reversible"),
            details,
            rolled_back: flag("rolled_back"),
            rolled_back_at: text("rolled_back_at"),
            snapshot_key: text("snapshot_hash").and_then(|key| key.parse().ok()),
        }
    }
}

impl OperationDetails {
    pub fn from_invocation(invocation: &ToolInvocation) -> Self {
        match invocation {
            ToolInvocation::FileWrite(write) => Self::FileWrite {
                file_path: write.file_path.clone(),
                content_hash: content_fingerprint(&write.content),
                content_length: write.content.chars().count(),
            },
            ToolInvocation::FileEdit(edit) => Self::FileEdit {
                file_path: edit.file_path.clone(),
                old_string: truncate_with_ellipsis(&edit.old_string, EDIT_PREVIEW_CHARS),
                new_string: truncate_with_ellipsis(&edit.new_string, EDIT_PREVIEW_CHARS),
            },
            ToolInvocation::ShellCommand(shell) => Self::ShellCommand {
                command: truncate_with_ellipsis(&shell.command, COMMAND_PREVIEW_CHARS),
            },
            ToolInvocation::MultiFileEdit(multi) => Self::MultiFileEdit {
                file_count: multi.edits.len(),
                files: listed_files(multi),
            },
            ToolInvocation::NotebookEdit(notebook) => Self::NotebookEdit {
                notebook_path: notebook.notebook_path.clone(),
                edit_mode: notebook.edit_mode.clone(),
                cell_type: notebook.cell_type.clone(),
            },
            ToolInvocation::AgentDelegation(task) => Self::AgentDelegation {
                prompt_preview: truncate_with_ellipsis(&task.prompt, PROMPT_PREVIEW_CHARS),
                subagent_type: task.subagent_type.clone(),
            },
        }
    }
}

/// File kinds are reversible from their snapshot; shell commands only when
/// they are git commands; delegated work never.
pub fn is_reversible(invocation: &ToolInvocation) -> bool {
    match invocation {
        ToolInvocation::ShellCommand(shell) => shell.command.trim().starts_with("git "),
        ToolInvocation::AgentDelegation(_) => false,
        _ => invocation.kind().modifies_files(),
    }
}

pub fn content_fingerprint(content: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(content.as_bytes()));
    digest[..CONTENT_HASH_CHARS].to_string()
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Per-edit paths where given, otherwise the call's own path.
fn listed_files(multi: &MultiFileEdit) -> Vec<String> {
    multi
        .edits
        .iter()
        .take(MULTI_EDIT_FILES_LISTED)
        .map(|edit| {
            if edit.file_path.is_empty() {
                multi.file_path.clone()
            } else {
                edit.file_path.clone()
            }
        })
        .collect()
}
