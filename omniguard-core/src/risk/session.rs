//! Per-session risk state machine.

use chrono::{DateTime, Duration, Utc};
use omniguard_config::RiskConfig;
use serde::{Deserialize, Deserializer, Serialize};

use crate::command_safety::Tier;

/// One scored decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskEvent {
    pub time: DateTime<Utc>,
    pub level: Tier,
    pub tool: String,
    pub reason: String,
    pub points: u32,
}

/// Persisted risk state of one agent session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub events: Vec<RiskEvent>,
    /// Written as RFC 3339; older files carry epoch seconds.
    #[serde(default, deserialize_with = "deserialize_deadline")]
    pub cooldown_until: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Deadline {
    Timestamp(DateTime<Utc>),
    EpochSeconds(f64),
}

fn deserialize_deadline<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Deadline>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Deadline::Timestamp(at)) => Ok(Some(at)),
        Some(Deadline::EpochSeconds(secs)) => from_epoch_seconds(secs)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("cooldown deadline out of range: {secs}"))),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownStatus {
    Active { remaining_secs: u64 },
    Inactive,
}

impl CooldownStatus {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// Read-only view reported by `omniguard status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub score: u32,
    pub escalation_active: bool,
    pub cooldown_active: bool,
    pub event_count: usize,
    pub created_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            created_at: now,
            score: 0,
            events: Vec::new(),
            cooldown_until: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, expiry_hours: u64) -> bool {
        let lifetime = i64::try_from(expiry_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or(Duration::MAX);
        now - self.created_at > lifetime
    }

    /// Score a non-Allow decision. Returns `false` when nothing was recorded.
    ///
    /// The cooldown deadline is armed once, the first time the score reaches
    /// the threshold while no deadline is set.
    pub fn record(
        &mut self,
        tier: Tier,
        tool: &str,
        reason: &str,
        now: DateTime<Utc>,
        config: &RiskConfig,
    ) -> bool {
        let points = tier.weight();
        if points == 0 {
            return false;
        }

        self.score = self.score.saturating_add(points);
        self.events.push(RiskEvent {
            time: now,
            level: tier,
            tool: tool.to_string(),
            reason: reason.to_string(),
            points,
        });
        if self.events.len() > config.max_events {
            let excess = self.events.len() - config.max_events;
            self.events.drain(..excess);
        }

        if self.score >= config.cooldown_threshold && self.cooldown_until.is_none() {
            let window = i64::try_from(config.cooldown_seconds)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX);
            let deadline = now
                .checked_add_signed(window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            self.cooldown_until = Some(deadline);
        }
        true
    }

    pub fn should_escalate(&self, config: &RiskConfig) -> bool {
        self.score >= config.escalation_threshold
    }

    /// Current cooldown status. A deadline that has passed is cleared, which
    /// is reported through the second tuple element so the caller can persist
    /// it. The score is retained.
    pub fn poll_cooldown(&mut self, now: DateTime<Utc>) -> (CooldownStatus, bool) {
        let Some(until) = self.cooldown_until else {
            return (CooldownStatus::Inactive, false);
        };
        if now < until {
            let remaining_secs = u64::try_from((until - now).num_seconds()).unwrap_or(0);
            return (CooldownStatus::Active { remaining_secs }, false);
        }
        self.cooldown_until = None;
        (CooldownStatus::Inactive, true)
    }

    /// Snapshot for reporting. A deadline that has passed but was not yet
    /// cleared counts as inactive.
    pub fn summary(&self, config: &RiskConfig, now: DateTime<Utc>) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            score: self.score,
            escalation_active: self.should_escalate(config),
            cooldown_active: self.cooldown_until.is_some_and(|until| until > now),
            event_count: self.events.len(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn score_is_sum_of_weights() {
        let config = RiskConfig::default();
        let mut state = SessionState::new("s", t0());
        assert!(state.record(Tier::Warn, "Edit", "JSON configuration modification", t0(), &config));
        assert!(state.record(Tier::Block, "Bash", "Filesystem format operation", t0(), &config));
        assert!(state.record(Tier::Confirm, "Bash", "Killing process", t0(), &config));
        assert!(!state.record(Tier::Allow, "Bash", "", t0(), &config));
        assert_eq!(state.score, 7);
        assert_eq!(state.events.len(), 3);
        assert_eq!(state.events[0].points, 1);
    }

    #[test]
    fn events_are_trimmed_to_the_most_recent() {
        let config = RiskConfig {
            max_events: 3,
            cooldown_threshold: 1_000,
            ..RiskConfig::default()
        };
        let mut state = SessionState::new("s", t0());
        for index in 0..5 {
            state.record(Tier::Warn, "Bash", &format!("event {index}"), t0(), &config);
        }
        assert_eq!(state.score, 5);
        let reasons: Vec<&str> = state.events.iter().map(|e| e.reason.as_str()).collect();
        assert_eq!(reasons, vec!["event 2", "event 3", "event 4"]);
    }

    #[test]
    fn escalation_starts_at_threshold() {
        let config = RiskConfig::default();
        let mut state = SessionState::new("s", t0());
        for _ in 0..9 {
            state.record(Tier::Warn, "Write", "Configuration file modification", t0(), &config);
        }
        assert!(!state.should_escalate(&config));
        state.record(Tier::Warn, "Write", "Configuration file modification", t0(), &config);
        assert!(state.should_escalate(&config));
    }

    #[test]
    fn cooldown_arms_once_and_clears_after_deadline() {
        let config = RiskConfig::default();
        let mut state = SessionState::new("s", t0());
        for _ in 0..6 {
            state.record(Tier::Block, "Bash", "Direct disk write operation", t0(), &config);
        }
        assert_eq!(state.score, 18);
        assert!(state.cooldown_until.is_none());

        state.record(Tier::Confirm, "Bash", "Killing process", t0(), &config);
        let deadline = t0() + Duration::seconds(60);
        assert_eq!(state.cooldown_until, Some(deadline));

        // Further events do not push the deadline out.
        let later = t0() + Duration::seconds(5);
        state.record(Tier::Confirm, "Bash", "Killing process", later, &config);
        assert_eq!(state.cooldown_until, Some(deadline));

        assert_eq!(
            state.poll_cooldown(t0() + Duration::milliseconds(30_500)),
            (CooldownStatus::Active { remaining_secs: 29 }, false)
        );
        assert_eq!(
            state.poll_cooldown(deadline),
            (CooldownStatus::Inactive, true)
        );
        assert!(state.cooldown_until.is_none());
        assert_eq!(state.score, 24);

        // The next risky event re-arms the cooldown because the score is still high.
        state.record(Tier::Warn, "Edit", "Configuration file modification", deadline, &config);
        assert_eq!(state.cooldown_until, Some(deadline + Duration::seconds(60)));
    }

    #[test]
    fn expiry_is_measured_from_creation() {
        let state = SessionState::new("s", t0());
        assert!(!state.is_expired(t0() + Duration::hours(24), 24));
        assert!(state.is_expired(t0() + Duration::hours(24) + Duration::seconds(1), 24));
    }

    #[test]
    fn summary_reflects_state() {
        let config = RiskConfig::default();
        let mut state = SessionState::new("abc", t0());
        state.record(Tier::Confirm, "Task", "Privilege escalation in agent prompt", t0(), &config);
        let summary = state.summary(&config, t0());
        assert_eq!(summary.session_id, "abc");
        assert_eq!(summary.score, 3);
        assert!(!summary.escalation_active);
        assert!(!summary.cooldown_active);
        assert_eq!(summary.event_count, 1);
        assert_eq!(summary.created_at, t0());
    }

    #[test]
    fn summary_ignores_a_passed_deadline() {
        let config = RiskConfig::default();
        let mut state = SessionState::new("abc", t0());
        for _ in 0..7 {
            state.record(Tier::Block, "Bash", "Filesystem format operation", t0(), &config);
        }
        assert!(state.summary(&config, t0()).cooldown_active);
        assert!(!state.summary(&config, t0() + Duration::seconds(60)).cooldown_active);

        let later = state.summary(&config, t0() + Duration::seconds(120));
        assert!(!later.cooldown_active);
        assert!(later.escalation_active);
        assert!(state.cooldown_until.is_some());
    }

    #[test]
    fn reads_legacy_session_files() {
        let raw = r#"{
            "created_at": "2026-03-01T12:00:00.123456+00:00",
            "score": 21,
            "events": [
                {"time": "2026-03-01T12:00:01+00:00", "level": "red", "tool": "Bash",
                 "reason": "Filesystem format operation", "points": 3},
                {"time": "2026-03-01T12:00:02+00:00", "level": "yellow", "tool": "Edit",
                 "reason": "JSON configuration modification", "points": 1}
            ],
            "cooldown_until": 1772366460.5
        }"#;
        let state: SessionState = serde_json::from_str(raw).unwrap();
        assert_eq!(state.score, 21);
        assert_eq!(state.events[0].level, Tier::Confirm);
        assert_eq!(state.events[1].level, Tier::Warn);
        assert_eq!(
            state.cooldown_until,
            Some(t0() + Duration::seconds(60) + Duration::milliseconds(500))
        );

        let cleared: SessionState =
            serde_json::from_str(r#"{"created_at": "2026-03-01T12:00:00Z", "cooldown_until": null}"#)
                .unwrap();
        assert_eq!(cleared.cooldown_until, None);
        assert!(serde_json::from_str::<SessionState>(
            r#"{"created_at": "2026-03-01T12:00:00Z", "cooldown_until": "soon"}"#
        )
        .is_err());
    }

    #[test]
    fn deadline_round_trips_as_rfc3339() {
        let config = RiskConfig::default();
        let mut state = SessionState::new("abc", t0());
        for _ in 0..7 {
            state.record(Tier::Block, "Bash", "Filesystem format operation", t0(), &config);
        }
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["cooldown_until"], serde_json::json!("2026-03-01T12:01:00Z"));
        let restored: SessionState = serde_json::from_value(json).unwrap();
        assert_eq!(restored, state);
    }
}
