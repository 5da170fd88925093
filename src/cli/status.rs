use anyhow::{Context, Result};
use chrono::Utc;
use omniguard_core::{HookContext, StatusReport};

use crate::main_helpers::write_json;

pub fn handle_status_command(compact: bool) -> Result<()> {
    let context = HookContext::discover().context("Failed to resolve omniguard data directory")?;
    let report = StatusReport::collect(&context, Utc::now());
    write_json(&report, !compact)
}
