use serde::Serialize;

use crate::command_safety::{Decision, Tier};

pub const PRE_TOOL_USE_EVENT: &str = "PreToolUse";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionDecision {
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: &'static str,
    pub permission_decision: PermissionDecision,
}

/// Hook output. An empty object lets the tool call proceed silently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_specific_output: Option<HookSpecificOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
}

impl GuardResponse {
    pub fn allow() -> Self {
        Self::default()
    }

    pub fn from_decision(decision: &Decision) -> Self {
        let reason = decision.reason_or_unknown();
        match decision.tier {
            Tier::Block => Self::deny(format!(
                "BLOCKED by omni-agent guardrails: {reason}\n\n\
                 This operation has been blocked for safety. \
                 If you believe this is a false positive, please review the command carefully."
            )),
            Tier::Confirm => Self::deny(format!(
                "DENIED by omni-agent guardrails (RED): {reason}\n\n\
                 This is a potentially dangerous operation that has been denied. \
                 If you need to perform this operation, the user must approve it \
                 through the agent's permission system."
            )),
            Tier::Warn => Self {
                hook_specific_output: None,
                system_message: Some(format!(
                    "WARNING (omni-agent): {reason}\n\nProceeding with caution."
                )),
            },
            Tier::Allow => Self::allow(),
        }
    }

    pub fn cooldown(remaining_secs: u64) -> Self {
        Self::deny(format!(
            "SESSION COOLDOWN ACTIVE ({remaining_secs}s remaining): \
             Too many risky operations detected in this session. \
             All tool use is temporarily suspended. \
             Please wait for the cooldown to expire."
        ))
    }

    fn deny(message: String) -> Self {
        Self {
            hook_specific_output: Some(HookSpecificOutput {
                hook_event_name: PRE_TOOL_USE_EVENT,
                permission_decision: PermissionDecision::Deny,
            }),
            system_message: Some(message),
        }
    }

    pub fn denies(&self) -> bool {
        self.hook_specific_output
            .as_ref()
            .is_some_and(|output| output.permission_decision == PermissionDecision::Deny)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn allow_serializes_to_empty_object() {
        assert_eq!(serde_json::to_value(GuardResponse::allow()).unwrap(), json!({}));
    }

    #[test]
    fn block_denies_with_reason() {
        let decision = Decision::matched(Tier::Block, "Filesystem format operation", r"mkfs\.");
        let response = GuardResponse::from_decision(&decision);
        assert!(response.denies());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value["hookSpecificOutput"],
            json!({"hookEventName": "PreToolUse", "permissionDecision": "deny"})
        );
        assert!(
            value["systemMessage"]
                .as_str()
                .unwrap()
                .starts_with("BLOCKED by omni-agent guardrails: Filesystem format operation\n\n")
        );
    }

    #[test]
    fn confirm_denies_and_warn_only_messages() {
        let confirm = Decision::matched(Tier::Confirm, "Killing process", r"\bkill\s+");
        let response = GuardResponse::from_decision(&confirm);
        assert!(response.denies());
        assert!(
            response
                .system_message
                .as_deref()
                .unwrap()
                .starts_with("DENIED by omni-agent guardrails (RED): Killing process")
        );

        let warn = Decision::matched(Tier::Warn, "Recursive ownership change", r"chown\s+-R");
        assert_eq!(
            serde_json::to_value(GuardResponse::from_decision(&warn)).unwrap(),
            json!({"systemMessage": "WARNING (omni-agent): Recursive ownership change\n\nProceeding with caution."})
        );
    }

    #[test]
    fn cooldown_reports_remaining_seconds() {
        let response = GuardResponse::cooldown(42);
        assert!(response.denies());
        assert!(
            response
                .system_message
                .unwrap()
                .starts_with("SESSION COOLDOWN ACTIVE (42s remaining): ")
        );
    }
}
