//! stockforest - Main Entry Point
//!
//! Scans a stock movement log and flags statistically abnormal movements.

use clap::Parser;
use stockforest::cli::{cmd_detect, cmd_info, Cli, Commands, DetectArgs};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockforest=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect { data, output, config, seed, contamination, trees, top } => {
            cmd_detect(&DetectArgs { data, output, config, seed, contamination, trees, top })?;
        }
        Commands::Info { data, config } => {
            cmd_info(&data, config.as_deref())?;
        }
    }

    Ok(())
}
