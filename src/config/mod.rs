//! Configuration loading and management.
//!
//! - [`types`]: config struct definitions and TOML loading

mod types;

pub use types::{BotConfig, Config, ConfigError, LogConfig, LogFormat};
