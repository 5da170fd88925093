//! Command-line surface. Each hook subcommand reads one JSON document from
//! stdin and answers with one on stdout.

use clap::{Parser, Subcommand};

mod guard;
mod status;
mod track;

pub use guard::handle_guard_command;
pub use status::handle_status_command;
pub use track::handle_track_command;

#[derive(Debug, Parser)]
#[command(name = "omniguard", version, about = "Safety hooks for autonomous coding agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Pre-execution hook: classify a pending tool call
    Guard,
    /// Post-execution hook: record a completed tool call for rollback
    Track,
    /// Print the current session and registry summary
    Status {
        /// Print the report on a single line
        #[arg(long)]
        compact: bool,
    },
}
