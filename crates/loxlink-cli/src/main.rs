//! loxlink CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use loxlink_cli::cli::{Cli, Command, ConfigAction};
use loxlink_cli::commands;
use loxlink_cli::config::LoxlinkConfig;
use loxlink_cli::error::CliResult;
use loxlink_cli::output::OutputFormat;
use loxlink_client::logging::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = match cli.config {
        Some(ref path) => LoxlinkConfig::load_from(path)?,
        None => LoxlinkConfig::load()?,
    }
    .merge_cli(&cli);

    let tracing = if cli.debug {
        TracingConfig::debug()
    } else {
        TracingConfig::default()
    };
    init_tracing(tracing.with_format(config.log_format()?))?;

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Tty
    };

    match cli.command {
        Some(Command::Listen {
            commands: ref requested,
            count,
        }) => {
            let to_send = if requested.is_empty() {
                &config.commands
            } else {
                requested
            };
            commands::listen::listen(&config, to_send, count, format).await
        }
        Some(Command::Config { ref action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
        None => commands::listen::listen(&config, &config.commands, None, format).await,
    }
}
