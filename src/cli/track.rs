use anyhow::Result;
use chrono::Utc;
use omniguard_core::{GuardResponse, HookContext, HookRequest, TrackerHook};
use tracing::warn;

use crate::main_helpers::{read_stdin, write_json};

pub fn handle_track_command() -> Result<()> {
    let input = read_stdin()?;
    let request = HookRequest::parse(&input);

    let response = match HookContext::discover() {
        Ok(context) => TrackerHook::new(context).handle(&request, Utc::now()),
        Err(error) => {
            warn!(error = %format!("{error:#}"), "no data directory; operation not recorded");
            GuardResponse::allow()
        }
    };
    write_json(&response, false)
}
