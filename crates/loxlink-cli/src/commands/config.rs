//! Configuration commands.

use crate::config::LoxlinkConfig;
use crate::error::{CliError, CliResult};

/// Dump the effective configuration to stdout.
pub fn dump(config: &LoxlinkConfig) -> CliResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| CliError::Config(format!("failed to serialize config: {e}")))?;
    println!("# config.toml ({})", LoxlinkConfig::default_path().display());
    println!("{toml_str}");
    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &LoxlinkConfig) -> CliResult<()> {
    config.log_format()?;
    let connection = config.connection_config()?;
    println!("endpoint: {}", connection.ws_url()?);
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> CliResult<()> {
    println!("config: {}", LoxlinkConfig::default_path().display());
    Ok(())
}
