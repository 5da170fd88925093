/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "OMNIGUARD_HOME";

/// Environment variable carrying the agent session identifier.
pub const SESSION_ID_ENV: &str = "CLAUDE_SESSION_ID";

/// Data directory relative to the user's home directory.
pub const DEFAULT_DATA_DIR: &[&str] = &[".claude", "omni-agent"];

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const REGISTRY_FILE_NAME: &str = "rollback_registry.json";
pub const SESSIONS_DIR_NAME: &str = "sessions";
pub const SNAPSHOTS_DIR_NAME: &str = "snapshots";
pub const SNAPSHOT_INDEX_FILE_NAME: &str = "index.json";
pub const PENDING_DIR_NAME: &str = "pending_snapshots";

pub mod defaults {
    pub const ESCALATION_THRESHOLD: u32 = 10;
    pub const COOLDOWN_THRESHOLD: u32 = 20;
    pub const COOLDOWN_SECONDS: u64 = 60;
    pub const SESSION_EXPIRY_HOURS: u64 = 24;
    pub const STALE_SESSION_HOURS: u64 = 48;
    pub const MAX_SESSION_EVENTS: usize = 200;

    /// Files above this size are never snapshotted.
    pub const MAX_SNAPSHOT_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MiB
    pub const VCS_TIMEOUT_MS: u64 = 2_000;
    pub const SNAPSHOT_EXPIRY_DAYS: u64 = 7;

    pub const MAX_REGISTRY_ENTRIES: usize = 500;

    /// Maintenance runs on roughly one guard invocation in this many.
    pub const SWEEP_ONE_IN: u32 = 50;
}
