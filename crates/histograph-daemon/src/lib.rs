//! histograph-core library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (start, check)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{check_dependencies, start_daemon, StartOverrides};
