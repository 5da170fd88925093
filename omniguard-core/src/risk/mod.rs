//! Session risk accumulation
//!
//! Every non-Allow decision adds points to the session score (Warn 1,
//! Block/Confirm 3). Past the escalation threshold Warn decisions become
//! Confirm; past the cooldown threshold every tool call is denied until the
//! cooldown deadline passes.

pub mod session;
pub mod store;

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use omniguard_config::RiskConfig;
use tracing::{debug, warn};

use crate::command_safety::Tier;

pub use session::{CooldownStatus, RiskEvent, SessionState, SessionSummary};
pub use store::{FileSessionStore, SessionStore, sanitize_session_id};

/// A loaded session bound to its store.
///
/// Loading never fails: a missing, unreadable or expired state starts a
/// fresh session.
pub struct RiskTracker<S: SessionStore> {
    store: S,
    config: RiskConfig,
    state: SessionState,
}

impl<S: SessionStore> RiskTracker<S> {
    pub fn open(store: S, config: RiskConfig, session_id: &str, now: DateTime<Utc>) -> Self {
        let state = match store.load(session_id) {
            Ok(Some(mut state)) if !state.is_expired(now, config.session_expiry_hours) => {
                state.session_id = session_id.to_string();
                state
            }
            Ok(Some(_)) => {
                debug!(session_id, "session expired, starting fresh");
                SessionState::new(session_id, now)
            }
            Ok(None) => SessionState::new(session_id, now),
            Err(error) => {
                warn!(session_id, error = %format!("{error:#}"), "discarding unreadable session state");
                SessionState::new(session_id, now)
            }
        };
        Self {
            store,
            config,
            state,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Score a decision and persist the session. Allow decisions are ignored.
    pub fn record(&mut self, tier: Tier, tool: &str, reason: &str, now: DateTime<Utc>) -> Result<()> {
        if !self.state.record(tier, tool, reason, now, &self.config) {
            return Ok(());
        }
        debug!(
            session_id = %self.state.session_id,
            score = self.state.score,
            %tier,
            "recorded risk event"
        );
        self.store.save(&self.state)
    }

    pub fn should_escalate(&self) -> bool {
        self.state.should_escalate(&self.config)
    }

    /// Check the cooldown, persisting the cleared deadline once it has passed.
    pub fn cooldown_status(&mut self, now: DateTime<Utc>) -> Result<CooldownStatus> {
        let (status, cleared) = self.state.poll_cooldown(now);
        if cleared {
            debug!(session_id = %self.state.session_id, "cooldown expired");
            self.store.save(&self.state)?;
        }
        Ok(status)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> SessionSummary {
        self.state.summary(&self.config, now)
    }

    /// Delete session files idle for longer than the configured stale age.
    pub fn purge_stale(&self, now: DateTime<Utc>) -> Result<usize> {
        let max_age = Duration::from_secs(self.config.stale_session_hours.saturating_mul(3600));
        self.store.purge_stale(now, max_age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn store(dir: &TempDir) -> FileSessionStore {
        FileSessionStore::new(dir.path().join("sessions"))
    }

    #[test]
    fn state_persists_between_openings() {
        let dir = TempDir::new().unwrap();
        let mut tracker = RiskTracker::open(store(&dir), RiskConfig::default(), "s1", t0());
        tracker
            .record(Tier::Confirm, "Bash", "Killing process", t0())
            .unwrap();

        let reopened = RiskTracker::open(store(&dir), RiskConfig::default(), "s1", t0());
        assert_eq!(reopened.state().score, 3);
        assert_eq!(reopened.state().events[0].reason, "Killing process");
    }

    #[test]
    fn allow_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let mut tracker = RiskTracker::open(store.clone(), RiskConfig::default(), "s1", t0());
        tracker.record(Tier::Allow, "Bash", "", t0()).unwrap();
        assert!(!store.session_file("s1").exists());
    }

    #[test]
    fn expired_session_starts_over() {
        let dir = TempDir::new().unwrap();
        let mut tracker = RiskTracker::open(store(&dir), RiskConfig::default(), "s1", t0());
        tracker
            .record(Tier::Block, "Bash", "Filesystem format operation", t0())
            .unwrap();

        let next_day = t0() + chrono::Duration::hours(25);
        let reopened = RiskTracker::open(store(&dir), RiskConfig::default(), "s1", next_day);
        assert_eq!(reopened.state().score, 0);
        assert_eq!(reopened.state().created_at, next_day);
    }

    #[test]
    fn corrupt_state_self_heals() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.session_file("s1"), b"\x00garbage").unwrap();

        let mut tracker = RiskTracker::open(store.clone(), RiskConfig::default(), "s1", t0());
        assert_eq!(tracker.state().score, 0);
        tracker
            .record(Tier::Warn, "Write", "Configuration file modification", t0())
            .unwrap();
        assert_eq!(store.load("s1").unwrap().map(|s| s.score), Some(1));
    }

    #[test]
    fn cleared_cooldown_is_persisted_and_score_kept() {
        let dir = TempDir::new().unwrap();
        let mut tracker = RiskTracker::open(store(&dir), RiskConfig::default(), "s1", t0());
        for _ in 0..7 {
            tracker
                .record(Tier::Block, "Bash", "Direct disk write operation", t0())
                .unwrap();
        }
        assert!(tracker.cooldown_status(t0()).unwrap().is_active());

        let after = t0() + chrono::Duration::seconds(61);
        assert_eq!(
            tracker.cooldown_status(after).unwrap(),
            CooldownStatus::Inactive
        );

        let reopened = RiskTracker::open(store(&dir), RiskConfig::default(), "s1", after);
        assert!(reopened.state().cooldown_until.is_none());
        assert_eq!(reopened.state().score, 21);
        assert!(reopened.should_escalate());
    }

    #[test]
    fn legacy_session_keeps_score_and_cooldown() {
        let dir = TempDir::new().unwrap();
        let sessions = dir.path().join("sessions");
        fs::create_dir_all(&sessions).unwrap();
        fs::write(
            sessions.join("s1.json"),
            r#"{
                "created_at": "2026-03-01T11:00:00+00:00",
                "score": 21,
                "events": [{"time": "2026-03-01T11:59:00+00:00", "level": "red",
                            "tool": "Bash", "reason": "Killing process", "points": 3}],
                "cooldown_until": 1772366430.0
            }"#,
        )
        .unwrap();

        let mut tracker = RiskTracker::open(store(&dir), RiskConfig::default(), "s1", t0());
        assert_eq!(tracker.state().score, 21);
        assert!(tracker.should_escalate());
        assert_eq!(
            tracker.cooldown_status(t0()).unwrap(),
            CooldownStatus::Active { remaining_secs: 30 }
        );
    }
}
