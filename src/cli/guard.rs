use anyhow::Result;
use chrono::Utc;
use omniguard_core::{GuardHook, GuardResponse, HookContext, HookRequest};
use tracing::warn;

use crate::main_helpers::{read_stdin, write_json};

pub fn handle_guard_command() -> Result<()> {
    let input = read_stdin()?;
    let request = HookRequest::parse(&input);

    let response = match HookContext::discover() {
        Ok(context) => GuardHook::new(context).handle(&request, Utc::now()),
        Err(error) => {
            warn!(error = %format!("{error:#}"), "no data directory; allowing without bookkeeping");
            GuardResponse::allow()
        }
    };
    write_json(&response, false)
}
