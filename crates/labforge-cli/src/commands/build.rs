//! `labforge build` — reconcile the host network and write the
//! descriptor.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use labforge_common::constants::{DEFAULT_COMPOSE_FILE, DEFAULT_CONFIG_FILE};
use labforge_compiler::compile;
use labforge_docker::reconcile::NetworkReconciler;
use labforge_docker::runtime::DockerCli;

/// Arguments for the `build` subcommand.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Path to the lab definition file.
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Path of the descriptor to write.
    #[arg(short, long, default_value = DEFAULT_COMPOSE_FILE)]
    pub output: PathBuf,
}

/// Executes the `build` command.
///
/// # Errors
///
/// Returns an error if compilation, network reconciliation, or file
/// I/O fails.
pub fn execute(args: BuildArgs) -> anyhow::Result<()> {
    let services = compile_to_file(&args.config, &args.output)?;
    println!("Generated {} ({services} services)", args.output.display());
    Ok(())
}

/// Compiles `config` against the host's docker runtime and writes the
/// descriptor to `output`. Returns the number of services emitted.
///
/// # Errors
///
/// Returns an error if the lab cannot be read, compiled, or written.
pub fn compile_to_file(config: &Path, output: &Path) -> anyhow::Result<usize> {
    tracing::info!(config = %config.display(), "building lab");

    let raw = std::fs::read_to_string(config)
        .with_context(|| format!("reading {}", config.display()))?;
    let doc: serde_yaml::Value =
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", config.display()))?;

    let mut reconciler = NetworkReconciler::new(DockerCli);
    let descriptor = compile(&doc, &mut reconciler)?;

    let yaml = serde_yaml::to_string(&descriptor)?;
    std::fs::write(output, &yaml).with_context(|| format!("writing {}", output.display()))?;
    tracing::info!(output = %output.display(), "descriptor written");

    Ok(descriptor.services.len())
}
