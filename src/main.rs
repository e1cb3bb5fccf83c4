//! CLI entry point: `graph_core <config.json>` trains the configured graph
//! and exits non-zero with the error on stderr when anything fails.

use anyhow::Context;
use clap::Parser;
use graph_core::Trainer;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "graph_core",
    version,
    about = "Train a JSON-defined computation graph"
)]
struct Cli {
    /// Run configuration: graph, optimizer, datasets, checkpoint path
    config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let mut trainer = Trainer::from_config_path(&cli.config, None)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    trainer.train().context("training failed")?;
    Ok(())
}
