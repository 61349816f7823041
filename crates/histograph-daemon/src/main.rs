//! Histograph core daemon
//!
//! Consumes change events from a Redis list, registers them with the graph
//! store and indexes node documents in the search engine.
//!
//! # Usage
//!
//! ```bash
//! histograph-core start [--batch-size N] [--batch-timeout MS] [--queue NAME]
//! histograph-core check
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/histograph/config.toml)
//! 3. Environment variables (HISTOGRAPH__*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use histograph_daemon::{check_dependencies, start_daemon, Cli, Commands, StartOverrides};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            batch_size,
            batch_timeout,
            queue,
        } => {
            let overrides = StartOverrides {
                batch_size,
                batch_timeout_ms: batch_timeout,
                queue,
                log_level: cli.log_level,
            };
            start_daemon(cli.config.as_deref(), overrides).await?;
        }
        Commands::Check => {
            check_dependencies(cli.config.as_deref(), cli.log_level.as_deref()).await?;
        }
    }

    Ok(())
}
