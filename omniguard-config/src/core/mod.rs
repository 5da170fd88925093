//! Typed configuration sections.

use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::constants::defaults;

/// Root configuration for the guard and tracker hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GuardConfig {
    /// Session risk accumulation.
    #[serde(default)]
    pub risk: RiskConfig,

    /// Pre-modification snapshots.
    #[serde(default)]
    pub snapshots: SnapshotConfig,

    /// Rollback registry.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Probabilistic housekeeping.
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

impl GuardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.risk.escalation_threshold == 0 {
            bail!("risk.escalation_threshold must be greater than zero");
        }
        if self.risk.cooldown_threshold < self.risk.escalation_threshold {
            bail!(
                "risk.cooldown_threshold ({}) must not be below risk.escalation_threshold ({})",
                self.risk.cooldown_threshold,
                self.risk.escalation_threshold
            );
        }
        if self.risk.max_events == 0 {
            bail!("risk.max_events must be greater than zero");
        }
        if self.registry.max_entries == 0 {
            bail!("registry.max_entries must be greater than zero");
        }
        if self.maintenance.sweep_one_in == 0 {
            bail!("maintenance.sweep_one_in must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RiskConfig {
    /// Score at which Warn decisions are escalated to Confirm.
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: u32,

    /// Score at which the session enters cooldown.
    #[serde(default = "default_cooldown_threshold")]
    pub cooldown_threshold: u32,

    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,

    /// Age after which a session starts over at zero.
    #[serde(default = "default_session_expiry_hours")]
    pub session_expiry_hours: u64,

    /// Idle age after which a session file is deleted by maintenance.
    #[serde(default = "default_stale_session_hours")]
    pub stale_session_hours: u64,

    #[serde(default = "default_max_events")]
    pub max_events: usize,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            escalation_threshold: default_escalation_threshold(),
            cooldown_threshold: default_cooldown_threshold(),
            cooldown_seconds: default_cooldown_seconds(),
            session_expiry_hours: default_session_expiry_hours(),
            stale_session_hours: default_stale_session_hours(),
            max_events: default_max_events(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SnapshotConfig {
    /// Largest file, in bytes, that will be snapshotted.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Upper bound for each version-control query.
    #[serde(default = "default_vcs_timeout_ms")]
    pub vcs_timeout_ms: u64,

    #[serde(default = "default_snapshot_expiry_days")]
    pub expiry_days: u64,
}

impl SnapshotConfig {
    pub fn vcs_timeout(&self) -> Duration {
        Duration::from_millis(self.vcs_timeout_ms)
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            vcs_timeout_ms: default_vcs_timeout_ms(),
            expiry_days: default_snapshot_expiry_days(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegistryConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_sweep_one_in")]
    pub sweep_one_in: u32,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            sweep_one_in: default_sweep_one_in(),
        }
    }
}

fn default_escalation_threshold() -> u32 {
    defaults::ESCALATION_THRESHOLD
}

fn default_cooldown_threshold() -> u32 {
    defaults::COOLDOWN_THRESHOLD
}

fn default_cooldown_seconds() -> u64 {
    defaults::COOLDOWN_SECONDS
}

fn default_session_expiry_hours() -> u64 {
    defaults::SESSION_EXPIRY_HOURS
}

fn default_stale_session_hours() -> u64 {
    defaults::STALE_SESSION_HOURS
}

fn default_max_events() -> usize {
    defaults::MAX_SESSION_EVENTS
}

fn default_max_file_size() -> u64 {
    defaults::MAX_SNAPSHOT_FILE_SIZE
}

fn default_vcs_timeout_ms() -> u64 {
    defaults::VCS_TIMEOUT_MS
}

fn default_snapshot_expiry_days() -> u64 {
    defaults::SNAPSHOT_EXPIRY_DAYS
}

fn default_max_entries() -> usize {
    defaults::MAX_REGISTRY_ENTRIES
}

fn default_sweep_one_in() -> u32 {
    defaults::SWEEP_ONE_IN
}
