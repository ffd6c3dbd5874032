//! `labforge plan` — compile offline and print the descriptor.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use labforge_common::constants::DEFAULT_CONFIG_FILE;
use labforge_compiler::{OfflinePlanner, compile};

/// Arguments for the `plan` subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the lab definition file.
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Write the descriptor to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Executes the `plan` command.
///
/// # Errors
///
/// Returns an error if the lab definition cannot be read or compiled.
pub fn execute(args: PlanArgs) -> anyhow::Result<()> {
    tracing::info!(config = %args.config.display(), "planning lab");

    let raw = std::fs::read_to_string(&args.config)
        .with_context(|| format!("reading {}", args.config.display()))?;
    let doc: serde_yaml::Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("parsing {}", args.config.display()))?;

    let descriptor = compile(&doc, &mut OfflinePlanner)?;
    let yaml = serde_yaml::to_string(&descriptor)?;

    if let Some(ref out_path) = args.output {
        std::fs::write(out_path, &yaml)
            .with_context(|| format!("writing {}", out_path.display()))?;
        println!("Planned {} -> {}", args.config.display(), out_path.display());
    } else {
        print!("{yaml}");
    }
    Ok(())
}
