use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::tool::ToolInvocation;

/// One hook request as read from stdin.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HookRequest {
    pub tool_name: String,
    pub tool_input: Value,
    /// Present on the post-execution pass. Not interpreted.
    pub tool_output: Value,
}

impl HookRequest {
    /// Parse a request, treating malformed input as an empty request.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return Self::default();
        }
        serde_json::from_str(raw).unwrap_or_else(|error| {
            debug!(%error, "ignoring malformed hook request");
            Self::default()
        })
    }

    pub fn invocation(&self) -> Option<ToolInvocation> {
        ToolInvocation::from_parts(&self.tool_name, &self.tool_input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolKind;

    #[test]
    fn parses_camel_case_fields() {
        let request = HookRequest::parse(
            r#"{"toolName": "Bash", "toolInput": {"command": "ls"}, "toolOutput": "a\nb"}"#,
        );
        assert_eq!(request.tool_name, "Bash");
        assert_eq!(
            request.invocation().map(|inv| inv.kind()),
            Some(ToolKind::ShellCommand)
        );
    }

    #[test]
    fn malformed_input_is_an_empty_request() {
        for raw in ["", "   ", "not json", "[1, 2]", r#"{"toolName": 5}"#] {
            let request = HookRequest::parse(raw);
            assert_eq!(request, HookRequest::default(), "{raw:?}");
            assert!(request.invocation().is_none());
        }
    }
}
