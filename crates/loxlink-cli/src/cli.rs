//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// loxlink - talk to a home-automation controller over its WebSocket API
#[derive(Debug, Parser)]
#[command(name = "loxlink")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "LOXLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Device host, with optional port
    #[arg(long, env = "LOXLINK_HOST")]
    pub host: Option<String>,

    /// Seconds between keepalive probes
    #[arg(long)]
    pub keepalive: Option<u64>,

    /// Log format: pretty, compact or json
    #[arg(long)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect, send commands and print events until the link closes
    Listen {
        /// Commands sent after connecting (replaces the configured list)
        commands: Vec<String>,

        /// Exit after this many events
        #[arg(long)]
        count: Option<usize>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Dump,
    /// Check the configuration
    Validate,
    /// Show the configuration file path
    Path,
}
