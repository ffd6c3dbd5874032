//! # labforge — virtual lab CLI
//!
//! Compiles a declarative lab definition into a deployment descriptor
//! and drives the container orchestrator that realizes it.

mod commands;

use clap::Parser;

use crate::commands::Cli;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
        )
        .init();

    let cli = Cli::parse();
    commands::execute(cli)
}
