//! CLI command definitions and dispatch.

pub mod build;
pub mod plan;
pub mod stop;
pub mod up;

use clap::{Parser, Subcommand};

/// labforge — compile and launch virtual network labs.
#[derive(Parser, Debug)]
#[command(name = "labforge", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile the lab offline and print the descriptor without
    /// touching the host.
    Plan(plan::PlanArgs),
    /// Reconcile the lab network on the host and write the descriptor.
    Build(build::BuildArgs),
    /// Build, then launch the lab and run until interrupted.
    Up(up::UpArgs),
    /// Stop the running lab.
    Stop(stop::StopArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Plan(args) => plan::execute(args),
        Command::Build(args) => build::execute(args),
        Command::Up(args) => up::execute(args),
        Command::Stop(args) => stop::execute(args),
    }
}
