//! Decision and bookkeeping engine behind the omniguard hooks.
//!
//! A guard pass runs [`command_safety`] classification, updates the session's
//! [`risk`] score and, for allowed file modifications, captures a
//! [`snapshot`] of the pre-image. A later tracker pass appends the completed
//! operation to the rollback [`registry`]. [`hooks`] wires these together
//! behind the JSON request/response contract.

pub mod command_safety;
pub mod hooks;
pub mod registry;
pub mod risk;
pub mod snapshot;
pub mod tool;
pub mod utils;

pub use command_safety::{Decision, Normalizer, PatternEngine, Tier};
pub use hooks::{GuardHook, GuardResponse, HookContext, HookRequest, StatusReport, TrackerHook};
pub use registry::{Operation, RollbackRegistry};
pub use risk::{CooldownStatus, RiskTracker, SessionState};
pub use snapshot::{SnapshotKey, SnapshotStore};
pub use tool::{ToolInvocation, ToolKind};
