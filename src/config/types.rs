//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Bot identity and console sender.
    #[serde(default)]
    pub bot: BotConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// The bot's own identity. Messages from it are ignored.
    #[serde(default = "default_identity")]
    pub identity: String,
    /// Sender identity attached to lines read from the console.
    #[serde(default = "default_sender")]
    pub sender: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            identity: default_identity(),
            sender: default_sender(),
        }
    }
}

fn default_identity() -> String {
    "@bot:localhost".to_string()
}

fn default_sender() -> String {
    "@console:localhost".to_string()
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration. `RUST_LOG` overrides `filter` when set.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive (default: "info").
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::default(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.bot.identity, "@bot:localhost");
        assert_eq!(config.bot.sender, "@console:localhost");
        assert_eq!(config.log.filter, "info");
        assert_eq!(config.log.format, LogFormat::Pretty);
    }

    #[test]
    fn parses_all_sections() {
        let config: Config = toml::from_str(
            r#"
            [bot]
            identity = "@helper:example.org"
            sender = "@alice:example.org"

            [log]
            filter = "slirc_dispatch=debug"
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.bot.identity, "@helper:example.org");
        assert_eq!(config.bot.sender, "@alice:example.org");
        assert_eq!(config.log.filter, "slirc_dispatch=debug");
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn rejects_unknown_log_format() {
        let result: Result<Config, _> = toml::from_str("[log]\nformat = \"xml\"");
        assert!(result.is_err());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[bot]\nidentity = \"@me:test\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.bot.identity, "@me:test");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/slirc-dispatch.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
