//! CLI argument parsing for histograph-core.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Histograph core
///
/// Drains the change queue into the graph store and the search index.
#[derive(Parser, Debug)]
#[command(name = "histograph-core")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/histograph/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Daemon commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingestion pipeline until interrupted
    Start {
        /// Documents per bulk request
        #[arg(long)]
        batch_size: Option<usize>,

        /// Milliseconds after its first document a batch is sent
        #[arg(long)]
        batch_timeout: Option<u64>,

        /// Redis list to consume
        #[arg(short, long)]
        queue: Option<String>,
    },

    /// Check connectivity to Redis, the search engine and the graph store
    Check,
}
