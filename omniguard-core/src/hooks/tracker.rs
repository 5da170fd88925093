//! Post-execution pass.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::HookContext;
use super::request::HookRequest;
use super::response::GuardResponse;
use crate::snapshot::SnapshotKey;
use crate::tool::ToolInvocation;

/// Appends completed tool calls to the rollback registry. Its response is
/// always empty.
pub struct TrackerHook {
    context: HookContext,
}

impl TrackerHook {
    pub fn new(context: HookContext) -> Self {
        Self { context }
    }

    pub fn handle(&self, request: &HookRequest, now: DateTime<Utc>) -> GuardResponse {
        let Some(invocation) = request.invocation() else {
            return GuardResponse::allow();
        };

        let snapshot_key = self.claim_snapshot(&invocation);
        if let Err(error) = self.context.registry().append(
            &invocation,
            &self.context.session_id,
            snapshot_key,
            now,
        ) {
            warn!(error = %format!("{error:#}"), "failed to append to rollback registry");
        }
        GuardResponse::allow()
    }

    fn claim_snapshot(&self, invocation: &ToolInvocation) -> Option<SnapshotKey> {
        let path = invocation.target_path()?;
        let tool = invocation.kind().tool_name();
        match self.context.pending_snapshots().take(tool, path) {
            Ok(pending) => pending.map(|pending| pending.snapshot_key),
            Err(error) => {
                warn!(path, error = %format!("{error:#}"), "discarding unreadable pending snapshot");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OperationDetails;
    use crate::snapshot::PendingSnapshot;
    use chrono::TimeZone;
    use omniguard_config::{DataPaths, GuardConfig};
    use serde_json::json;
    use tempfile::TempDir;

    fn tracker(dir: &TempDir) -> TrackerHook {
        let paths = DataPaths::new(dir.path());
        TrackerHook::new(HookContext::new(paths, GuardConfig::default(), "s1", "/home/agent"))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn links_pending_snapshot_to_operation() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        let key = SnapshotKey::Content("12".repeat(32));
        tracker
            .context
            .pending_snapshots()
            .put(&PendingSnapshot {
                snapshot_key: key.clone(),
                file_path: "/w/a.txt".into(),
                tool: "Write".into(),
            })
            .unwrap();

        let request = HookRequest {
            tool_name: "Write".into(),
            tool_input: json!({"file_path": "/w/a.txt", "content": "hi"}),
            tool_output: json!("ok"),
        };
        assert_eq!(tracker.handle(&request, now()), GuardResponse::allow());

        let operations = tracker.context.registry().for_session("s1");
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].snapshot_key, Some(key));
        assert!(operations[0].reversible);
        assert!(
            tracker
                .context
                .pending_snapshots()
                .take("Write", "/w/a.txt")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn records_shell_commands_without_snapshot() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        let request = HookRequest {
            tool_name: "Bash".into(),
            tool_input: json!({"command": "cargo build"}),
            ..HookRequest::default()
        };
        tracker.handle(&request, now());

        let operations = tracker.context.registry().load().operations;
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].snapshot_key, None);
        assert!(!operations[0].reversible);
        assert_eq!(
            operations[0].details,
            OperationDetails::ShellCommand {
                command: "cargo build".into()
            }
        );
    }

    #[test]
    fn unknown_tools_are_not_recorded() {
        let dir = TempDir::new().unwrap();
        let tracker = tracker(&dir);
        tracker.handle(&HookRequest::parse(r#"{"toolName": "Glob"}"#), now());
        tracker.handle(&HookRequest::parse("garbage"), now());
        assert!(tracker.context.registry().load().operations.is_empty());
    }
}
