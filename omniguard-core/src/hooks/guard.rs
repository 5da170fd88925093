//! Pre-execution pass.

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::HookContext;
use super::request::HookRequest;
use super::response::GuardResponse;
use crate::command_safety::{Decision, PatternEngine};
use crate::risk::{CooldownStatus, RiskTracker, SessionStore};
use crate::snapshot::{GitCli, PendingSnapshot, SnapshotStore, VersionControl};
use crate::tool::ToolInvocation;

pub struct GuardHook<V: VersionControl = GitCli> {
    context: HookContext,
    engine: PatternEngine,
    snapshots: SnapshotStore<V>,
}

impl GuardHook<GitCli> {
    pub fn new(context: HookContext) -> Self {
        let snapshots = SnapshotStore::with_git(
            context.paths.snapshots_dir(),
            context.config.snapshots.clone(),
        );
        Self::with_snapshots(context, snapshots)
    }
}

impl<V: VersionControl> GuardHook<V> {
    pub fn with_vcs(context: HookContext, vcs: V) -> Self {
        let snapshots = SnapshotStore::new(
            context.paths.snapshots_dir(),
            context.config.snapshots.clone(),
            vcs,
        );
        Self::with_snapshots(context, snapshots)
    }

    fn with_snapshots(context: HookContext, snapshots: SnapshotStore<V>) -> Self {
        let engine = PatternEngine::new(context.normalizer());
        Self {
            context,
            engine,
            snapshots,
        }
    }

    pub fn context(&self) -> &HookContext {
        &self.context
    }

    /// Decide on one request. Bookkeeping failures are logged and never
    /// change the returned response.
    pub fn handle(&self, request: &HookRequest, now: DateTime<Utc>) -> GuardResponse {
        let mut risk = RiskTracker::open(
            self.context.session_store(),
            self.context.config.risk.clone(),
            &self.context.session_id,
            now,
        );

        let cooldown = risk.cooldown_status(now).unwrap_or_else(|error| {
            warn!(error = %format!("{error:#}"), "failed to persist cleared cooldown");
            CooldownStatus::Inactive
        });
        if let CooldownStatus::Active { remaining_secs } = cooldown {
            info!(session_id = %self.context.session_id, remaining_secs, "session in cooldown");
            return GuardResponse::cooldown(remaining_secs);
        }

        let response = match request.invocation() {
            Some(invocation) => self.guard(&invocation, &mut risk, now),
            None => {
                debug!(tool = %request.tool_name, "no policy for tool");
                GuardResponse::allow()
            }
        };

        self.maybe_sweep(&risk, now);
        response
    }

    fn guard<S: SessionStore>(
        &self,
        invocation: &ToolInvocation,
        risk: &mut RiskTracker<S>,
        now: DateTime<Utc>,
    ) -> GuardResponse {
        let mut decision = self.engine.evaluate(invocation);
        if risk.should_escalate() {
            decision = decision.escalate();
        }

        let tool = invocation.kind().tool_name();
        if let Err(error) = risk.record(decision.tier, tool, decision.reason_or_unknown(), now) {
            warn!(error = %format!("{error:#}"), "failed to save session risk");
        }
        if decision.tier.denies() {
            info!(
                tool,
                tier = %decision.tier,
                reason = decision.reason_or_unknown(),
                "denied tool call"
            );
        }

        let response = GuardResponse::from_decision(&decision);
        self.capture_pre_image(invocation, &decision, now);
        response
    }

    /// Snapshot the target of an allowed file modification and leave its key
    /// for the tracker pass.
    fn capture_pre_image(
        &self,
        invocation: &ToolInvocation,
        decision: &Decision,
        now: DateTime<Utc>,
    ) {
        if decision.tier.denies() || !invocation.kind().modifies_files() {
            return;
        }
        let Some(path) = invocation.target_path() else {
            return;
        };

        let key = match self.snapshots.capture(Path::new(path), now) {
            Ok(Some(key)) => key,
            Ok(None) => return,
            Err(error) => {
                warn!(path, error = %format!("{error:#}"), "snapshot failed");
                return;
            }
        };
        let pending = PendingSnapshot {
            snapshot_key: key,
            file_path: path.to_string(),
            tool: invocation.kind().tool_name().to_string(),
        };
        if let Err(error) = self.context.pending_snapshots().put(&pending) {
            warn!(path, error = %format!("{error:#}"), "failed to record pending snapshot");
        }
    }

    fn maybe_sweep<S: SessionStore>(&self, risk: &RiskTracker<S>, now: DateTime<Utc>) {
        let one_in = self.context.config.maintenance.sweep_one_in.max(1);
        if !rand::random_ratio(1, one_in) {
            return;
        }
        match risk.purge_stale(now) {
            Ok(removed) => debug!(removed, "purged stale sessions"),
            Err(error) => debug!(error = %format!("{error:#}"), "session purge failed"),
        }
        match self.snapshots.reclaim(now) {
            Ok(reclaimed) => debug!(?reclaimed, "reclaimed snapshots"),
            Err(error) => debug!(error = %format!("{error:#}"), "snapshot reclaim failed"),
        }
    }
}
