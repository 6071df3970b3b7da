//! CLI configuration.
//!
//! Settings live in `~/.config/loxlink/config.toml` by default. Command-line
//! flags override file values.
//!
//! ```toml
//! host = "192.168.1.77"
//! keepalive_secs = 30
//! log_format = "compact"
//! commands = ["jdev/sps/enablebinstatusupdate"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use loxlink_client::ConnectionConfig;
use loxlink_client::logging::LogFormat;
use loxlink_protocol::command;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{CliError, CliResult};

/// Configuration for the loxlink CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoxlinkConfig {
    /// Device host, with optional port.
    pub host: Option<String>,

    /// Seconds between keepalive probes.
    pub keepalive_secs: u64,

    /// Log format: pretty, compact or json.
    pub log_format: Option<String>,

    /// Commands sent after connecting.
    pub commands: Vec<String>,
}

impl Default for LoxlinkConfig {
    fn default() -> Self {
        Self {
            host: None,
            keepalive_secs: 30,
            log_format: None,
            commands: vec![command::ENABLE_STATUS_UPDATES.to_string()],
        }
    }
}

impl LoxlinkConfig {
    /// Loads configuration from the default path, or defaults if it does not exist.
    pub fn load() -> CliResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| CliError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("loxlink")
            .join("config.toml")
    }

    /// Applies command-line overrides.
    pub fn merge_cli(mut self, cli: &Cli) -> Self {
        if let Some(ref host) = cli.host {
            self.host = Some(host.clone());
        }
        if let Some(secs) = cli.keepalive {
            self.keepalive_secs = secs;
        }
        if let Some(ref format) = cli.log_format {
            self.log_format = Some(format.clone());
        }
        self
    }

    /// Parsed log format, defaulting to compact.
    pub fn log_format(&self) -> CliResult<LogFormat> {
        self.log_format
            .as_deref()
            .map_or(Ok(LogFormat::default()), str::parse)
            .map_err(CliError::Config)
    }

    /// Builds the connection configuration.
    pub fn connection_config(&self) -> CliResult<ConnectionConfig> {
        let host = self
            .host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| CliError::Config("no host configured (use --host)".to_string()))?;

        let config = ConnectionConfig::new(host)
            .with_keepalive_interval(Duration::from_secs(self.keepalive_secs));
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let config = LoxlinkConfig::default();
        assert_eq!(config.keepalive_secs, 30);
        assert_eq!(config.commands, vec![command::ENABLE_STATUS_UPDATES]);
        assert!(config.connection_config().is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
host = "10.0.0.5:8080"
keepalive_secs = 10
log_format = "json"
commands = ["jdev/sps/LoxAPPversion3"]
"#
        )
        .unwrap();

        let config = LoxlinkConfig::load_from(file.path()).unwrap();
        assert_eq!(config.host.as_deref(), Some("10.0.0.5:8080"));
        assert_eq!(config.log_format().unwrap(), LogFormat::Json);
        assert_eq!(config.commands, vec!["jdev/sps/LoxAPPversion3"]);

        let connection = config.connection_config().unwrap();
        assert_eq!(connection.keepalive_interval, Duration::from_secs(10));
        assert_eq!(
            connection.ws_url().unwrap().as_str(),
            "ws://10.0.0.5:8080/ws/rfc6455"
        );
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"host = "miniserver""#).unwrap();

        let config = LoxlinkConfig::load_from(file.path()).unwrap();
        assert_eq!(config.keepalive_secs, 30);
        assert_eq!(config.commands, vec![command::ENABLE_STATUS_UPDATES]);
    }

    #[test]
    fn malformed_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "keepalive_secs = \"soon\"").unwrap();

        assert!(matches!(
            LoxlinkConfig::load_from(file.path()),
            Err(CliError::ParseConfig { .. })
        ));
        assert!(matches!(
            LoxlinkConfig::load_from(Path::new("/nonexistent/loxlink.toml")),
            Err(CliError::ReadConfig { .. })
        ));
    }

    #[test]
    fn cli_overrides_file() {
        let cli = Cli::try_parse_from([
            "loxlink",
            "--host",
            "192.168.1.77",
            "--keepalive",
            "5",
            "--log-format",
            "pretty",
        ])
        .unwrap();
        let config = LoxlinkConfig {
            host: Some("old".into()),
            ..LoxlinkConfig::default()
        }
        .merge_cli(&cli);

        assert_eq!(config.host.as_deref(), Some("192.168.1.77"));
        assert_eq!(config.keepalive_secs, 5);
        assert_eq!(config.log_format().unwrap(), LogFormat::Pretty);
    }

    #[test]
    fn rejects_bad_values() {
        let config = LoxlinkConfig {
            host: Some("miniserver".into()),
            keepalive_secs: 0,
            log_format: Some("xml".into()),
            ..LoxlinkConfig::default()
        };
        assert!(config.connection_config().is_err());
        assert!(matches!(config.log_format(), Err(CliError::Config(_))));
    }

    #[test]
    fn default_path_ends_with_config_toml() {
        let path = LoxlinkConfig::default_path();
        assert!(path.ends_with("loxlink/config.toml"));
    }
}
