//! `labforge stop` — stop the running lab.

use std::path::PathBuf;

use clap::Args;
use labforge_common::constants::DEFAULT_COMPOSE_FILE;
use labforge_docker::orchestrator;

/// Arguments for the `stop` subcommand.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Path of the descriptor whose project to stop.
    #[arg(default_value = DEFAULT_COMPOSE_FILE)]
    pub file: PathBuf,
}

/// Executes the `stop` command.
///
/// # Errors
///
/// Returns an error if the orchestrator invocation fails.
pub fn execute(args: StopArgs) -> anyhow::Result<()> {
    orchestrator::stop(&args.file)?;
    println!("Lab stopped.");
    Ok(())
}
