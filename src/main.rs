//! omniguard - safety hooks for autonomous coding agents
//!
//! Thin binary entry point that delegates to the CLI handlers.

use anyhow::Result;
use clap::Parser;

mod cli;
mod main_helpers;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let args = Cli::parse();
    main_helpers::initialize_tracing();

    match args.command {
        Commands::Guard => cli::handle_guard_command(),
        Commands::Track => cli::handle_track_command(),
        Commands::Status { compact } => cli::handle_status_command(compact),
    }
}
