//! Configuration for the omniguard hooks.
//!
//! Thresholds and limits live in [`GuardConfig`], loaded from an optional
//! `config.toml` inside the data directory. Every field has a serde default so
//! a partial file only overrides what it names.

pub mod constants;
pub mod core;
pub mod loader;
pub mod paths;

pub use crate::core::{
    GuardConfig, MaintenanceConfig, RegistryConfig, RiskConfig, SnapshotConfig,
};
pub use loader::load_config;
pub use paths::{DataPaths, resolve_session_id};
