//! Read-only session report.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::HookContext;
use crate::risk::{RiskTracker, SessionSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub operations: usize,
    pub session_operations: usize,
    pub reversible: usize,
    pub rolled_back: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub data_dir: String,
    pub session: SessionSummary,
    /// Seconds left on an active cooldown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_remaining_secs: Option<u64>,
    pub registry: RegistrySummary,
}

impl StatusReport {
    pub fn collect(context: &HookContext, now: DateTime<Utc>) -> Self {
        let risk = RiskTracker::open(
            context.session_store(),
            context.config.risk.clone(),
            &context.session_id,
            now,
        );
        let cooldown_remaining_secs = risk
            .state()
            .cooldown_until
            .filter(|until| *until > now)
            .map(|until| u64::try_from((until - now).num_seconds()).unwrap_or(0));

        let operations = context.registry().load().operations;
        let registry = RegistrySummary {
            operations: operations.len(),
            session_operations: operations
                .iter()
                .filter(|op| op.session_id == context.session_id)
                .count(),
            reversible: operations.iter().filter(|op| op.reversible).count(),
            rolled_back: operations.iter().filter(|op| op.rolled_back).count(),
        };

        Self {
            data_dir: context.paths.root().display().to_string(),
            session: risk.summary(now),
            cooldown_remaining_secs,
            registry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_safety::Tier;
    use crate::tool::{ShellCommand, ToolInvocation};
    use chrono::TimeZone;
    use omniguard_config::{DataPaths, GuardConfig};
    use tempfile::TempDir;

    #[test]
    fn reports_session_and_registry() {
        let dir = TempDir::new().unwrap();
        let context = HookContext::new(
            DataPaths::new(dir.path()),
            GuardConfig::default(),
            "s1",
            "/home/agent",
        );
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let mut risk = RiskTracker::open(
            context.session_store(),
            context.config.risk.clone(),
            "s1",
            now,
        );
        risk.record(Tier::Confirm, "Bash", "Killing process", now).unwrap();
        let shell = ToolInvocation::ShellCommand(ShellCommand {
            command: "git stash".into(),
        });
        context.registry().append(&shell, "s1", None, now).unwrap();
        context.registry().append(&shell, "other", None, now).unwrap();

        let report = StatusReport::collect(&context, now);
        assert_eq!(report.session.score, 3);
        assert_eq!(report.session.event_count, 1);
        assert_eq!(report.cooldown_remaining_secs, None);
        assert_eq!(
            report.registry,
            RegistrySummary {
                operations: 2,
                session_operations: 1,
                reversible: 2,
                rolled_back: 0,
            }
        );
    }

    #[test]
    fn passed_cooldown_is_reported_inactive() {
        let dir = TempDir::new().unwrap();
        let context = HookContext::new(
            DataPaths::new(dir.path()),
            GuardConfig::default(),
            "s1",
            "/home/agent",
        );
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut risk = RiskTracker::open(
            context.session_store(),
            context.config.risk.clone(),
            "s1",
            t0,
        );
        for _ in 0..7 {
            risk.record(Tier::Block, "Bash", "Filesystem format operation", t0)
                .unwrap();
        }

        let during = StatusReport::collect(&context, t0 + chrono::Duration::seconds(20));
        assert!(during.session.cooldown_active);
        assert_eq!(during.cooldown_remaining_secs, Some(40));

        let after = StatusReport::collect(&context, t0 + chrono::Duration::seconds(120));
        assert!(!after.session.cooldown_active);
        assert_eq!(after.cooldown_remaining_secs, None);
        assert_eq!(after.session.score, 21);
    }
}
