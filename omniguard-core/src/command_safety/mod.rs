//! Command safety classification
//!
//! Classifies each proposed tool invocation into one of four tiers:
//! - `Block`: always denied
//! - `Confirm`: denied with an explanation, the user must approve it elsewhere
//! - `Warn`: allowed with a system message
//! - `Allow`: silent pass
//!
//! Shell commands are normalized first (see [`normalizer`]) and every
//! canonical variant is matched against the static rule catalogue in
//! [`rules`].

pub mod engine;
pub mod normalizer;
pub mod rules;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

pub use engine::{CompiledRule, NetworkRule, PatternEngine, RuleCatalogue};
pub use normalizer::{DECODED_MARKER, NormalizedCommand, Normalizer};

/// Reason prefix applied when a Warn decision is escalated by session risk.
pub const ESCALATION_PREFIX: &str = "ESCALATED (high session risk): ";

/// Rule reference recorded for network-sensitivity combinator matches.
pub const NETWORK_SENSITIVE_RULE: &str = "network_sensitive";

/// Decision tier, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Block,
    /// Also read from the older `red` level.
    #[serde(alias = "red")]
    Confirm,
    #[serde(alias = "yellow")]
    Warn,
    Allow,
}

impl Tier {
    /// Risk points contributed to the session score.
    pub fn weight(self) -> u32 {
        match self {
            Tier::Block | Tier::Confirm => 3,
            Tier::Warn => 1,
            Tier::Allow => 0,
        }
    }

    /// Whether the agent must not proceed.
    pub fn denies(self) -> bool {
        matches!(self, Tier::Block | Tier::Confirm)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Block => "block",
            Tier::Confirm => "confirm",
            Tier::Warn => "warn",
            Tier::Allow => "allow",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying a single invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub tier: Tier,
    pub reason: Option<String>,
    /// The literal pattern that matched, or [`NETWORK_SENSITIVE_RULE`].
    pub matched_rule: Option<String>,
}

impl Decision {
    pub fn allow() -> Self {
        Self {
            tier: Tier::Allow,
            reason: None,
            matched_rule: None,
        }
    }

    pub fn matched(tier: Tier, reason: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            tier,
            reason: Some(reason.into()),
            matched_rule: Some(rule.into()),
        }
    }

    pub fn reason_or_unknown(&self) -> &str {
        self.reason.as_deref().unwrap_or("unknown")
    }

    /// Upgrade a Warn decision to Confirm with an escalation-annotated reason.
    /// Other tiers are returned unchanged.
    pub fn escalate(self) -> Self {
        if self.tier != Tier::Warn {
            return self;
        }
        Self {
            tier: Tier::Confirm,
            reason: Some(format!("{ESCALATION_PREFIX}{}", self.reason_or_unknown())),
            matched_rule: self.matched_rule,
        }
    }
}

pub(crate) fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        // Panic is acceptable: every static pattern is exercised by unit tests
        Err(err) => panic!("invalid regex pattern `{pattern}`: {err}"),
    }
}

pub(crate) fn compile_case_insensitive(pattern: &str) -> Regex {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => regex,
        Err(err) => panic!("invalid rule pattern `{pattern}`: {err}"),
    }
}
