//! The `loxlink` command-line tool.
//!
//! Connects to a device, sends configured commands and prints every event
//! the connection reports, either as readable lines or as JSON lines.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use error::{CliError, CliResult};
