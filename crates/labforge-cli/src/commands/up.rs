//! `labforge up` — build, launch, and run until interrupted.

use std::path::PathBuf;
use std::sync::mpsc;

use clap::Args;
use labforge_common::constants::{DEFAULT_COMPOSE_FILE, DEFAULT_CONFIG_FILE};
use labforge_docker::orchestrator;

/// Arguments for the `up` subcommand.
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Path to the lab definition file.
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Path of the descriptor to write and launch.
    #[arg(short, long, default_value = DEFAULT_COMPOSE_FILE)]
    pub output: PathBuf,

    /// Launch an existing descriptor without recompiling.
    #[arg(long)]
    pub no_build: bool,
}

/// Executes the `up` command: compile (unless `--no-build`), pull and
/// build images, then run the lab until Ctrl-C.
///
/// # Errors
///
/// Returns an error if any stage fails or the interrupt handler cannot
/// be installed.
pub fn execute(args: UpArgs) -> anyhow::Result<()> {
    if !args.no_build {
        let services = super::build::compile_to_file(&args.config, &args.output)?;
        println!("Generated {} ({services} services)", args.output.display());
    }

    orchestrator::prepare(&args.output)?;
    let process = orchestrator::launch(&args.output)?;
    println!("Lab running; press Ctrl-C to stop.");

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })?;
    let _ = rx.recv();

    println!("Stopping lab...");
    orchestrator::stop(&args.output)?;
    let code = process.wait()?;
    tracing::debug!(code, "compose up finished");
    Ok(())
}
