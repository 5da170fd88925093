//! Strongly typed view of the agent's tool invocations.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// The tool families the guard understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    #[serde(rename = "Bash")]
    ShellCommand,
    #[serde(rename = "Write")]
    FileWrite,
    #[serde(rename = "Edit")]
    FileEdit,
    #[serde(rename = "MultiEdit")]
    MultiFileEdit,
    #[serde(rename = "NotebookEdit")]
    NotebookEdit,
    #[serde(rename = "Task")]
    AgentDelegation,
}

impl ToolKind {
    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name {
            "Bash" => Some(Self::ShellCommand),
            "Write" => Some(Self::FileWrite),
            "Edit" => Some(Self::FileEdit),
            "MultiEdit" => Some(Self::MultiFileEdit),
            "NotebookEdit" => Some(Self::NotebookEdit),
            "Task" => Some(Self::AgentDelegation),
            _ => None,
        }
    }

    /// Name used by the agent and persisted in state files.
    pub fn tool_name(self) -> &'static str {
        match self {
            Self::ShellCommand => "Bash",
            Self::FileWrite => "Write",
            Self::FileEdit => "Edit",
            Self::MultiFileEdit => "MultiEdit",
            Self::NotebookEdit => "NotebookEdit",
            Self::AgentDelegation => "Task",
        }
    }

    /// Whether the tool replaces file content on disk.
    pub fn modifies_files(self) -> bool {
        matches!(
            self,
            Self::FileWrite | Self::FileEdit | Self::MultiFileEdit | Self::NotebookEdit
        )
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tool_name())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShellCommand {
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileWrite {
    pub file_path: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileEdit {
    pub file_path: String,
    pub old_string: String,
    pub new_string: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditSpec {
    pub file_path: String,
    pub old_string: String,
    pub new_string: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MultiFileEdit {
    pub file_path: String,
    pub edits: Vec<EditSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotebookEdit {
    pub notebook_path: String,
    pub edit_mode: String,
    pub cell_type: String,
}

impl Default for NotebookEdit {
    fn default() -> Self {
        Self {
            notebook_path: String::new(),
            edit_mode: "replace".to_string(),
            cell_type: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AgentDelegation {
    pub prompt: String,
    pub subagent_type: String,
}

/// A proposed or completed tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolInvocation {
    ShellCommand(ShellCommand),
    FileWrite(FileWrite),
    FileEdit(FileEdit),
    MultiFileEdit(MultiFileEdit),
    NotebookEdit(NotebookEdit),
    AgentDelegation(AgentDelegation),
}

impl ToolInvocation {
    /// Build an invocation from the agent's `toolName`/`toolInput` pair.
    ///
    /// Unknown tools and payloads of the wrong shape yield `None`, which the
    /// hooks treat as a silent allow with nothing to record.
    pub fn from_parts(tool_name: &str, tool_input: &Value) -> Option<Self> {
        let kind = ToolKind::from_tool_name(tool_name)?;
        let invocation = match kind {
            ToolKind::ShellCommand => Self::ShellCommand(decode_payload(tool_name, tool_input)?),
            ToolKind::FileWrite => Self::FileWrite(decode_payload(tool_name, tool_input)?),
            ToolKind::FileEdit => Self::FileEdit(decode_payload(tool_name, tool_input)?),
            ToolKind::MultiFileEdit => {
                Self::MultiFileEdit(decode_payload(tool_name, tool_input)?)
            }
            ToolKind::NotebookEdit => Self::NotebookEdit(decode_payload(tool_name, tool_input)?),
            ToolKind::AgentDelegation => {
                Self::AgentDelegation(decode_payload(tool_name, tool_input)?)
            }
        };
        Some(invocation)
    }

    pub fn kind(&self) -> ToolKind {
        match self {
            Self::ShellCommand(_) => ToolKind::ShellCommand,
            Self::FileWrite(_) => ToolKind::FileWrite,
            Self::FileEdit(_) => ToolKind::FileEdit,
            Self::MultiFileEdit(_) => ToolKind::MultiFileEdit,
            Self::NotebookEdit(_) => ToolKind::NotebookEdit,
            Self::AgentDelegation(_) => ToolKind::AgentDelegation,
        }
    }

    /// The file a file-modifying invocation targets. `None` for other kinds
    /// and for an empty path.
    pub fn target_path(&self) -> Option<&str> {
        let path = match self {
            Self::FileWrite(write) => write.file_path.as_str(),
            Self::FileEdit(edit) => edit.file_path.as_str(),
            Self::MultiFileEdit(edit) => edit.file_path.as_str(),
            Self::NotebookEdit(edit) => edit.notebook_path.as_str(),
            Self::ShellCommand(_) | Self::AgentDelegation(_) => return None,
        };
        (!path.is_empty()).then_some(path)
    }
}

fn decode_payload<T: DeserializeOwned + Default>(tool_name: &str, input: &Value) -> Option<T> {
    if !input.is_object() {
        return Some(T::default());
    }
    match serde_json::from_value(input.clone()) {
        Ok(payload) => Some(payload),
        Err(error) => {
            debug!(tool = tool_name, %error, "tool input does not match the expected shape");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_shell_command() {
        let invocation =
            ToolInvocation::from_parts("Bash", &json!({"command": "ls -la"})).unwrap();
        assert_eq!(
            invocation,
            ToolInvocation::ShellCommand(ShellCommand {
                command: "ls -la".into()
            })
        );
        assert_eq!(invocation.kind().tool_name(), "Bash");
        assert!(invocation.target_path().is_none());
    }

    #[test]
    fn notebook_target_uses_notebook_path() {
        let invocation = ToolInvocation::from_parts(
            "NotebookEdit",
            &json!({"notebook_path": "/w/analysis.ipynb", "cell_type": "code"}),
        )
        .unwrap();
        assert_eq!(invocation.target_path(), Some("/w/analysis.ipynb"));
        match invocation {
            ToolInvocation::NotebookEdit(edit) => assert_eq!(edit.edit_mode, "replace"),
            other => panic!("unexpected invocation: {other:?}"),
        }
    }

    #[test]
    fn unknown_tool_is_ignored() {
        assert!(ToolInvocation::from_parts("Read", &json!({"file_path": "/x"})).is_none());
    }

    #[test]
    fn missing_input_defaults_to_empty_payload() {
        let invocation = ToolInvocation::from_parts("Write", &Value::Null).unwrap();
        assert!(invocation.target_path().is_none());
        assert!(invocation.kind().modifies_files());
    }

    #[test]
    fn mistyped_payload_is_rejected() {
        assert!(ToolInvocation::from_parts("Bash", &json!({"command": 42})).is_none());
    }
}
