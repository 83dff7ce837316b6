// Runtime settings: defaults overridden by NETDIAG_* environment variables

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::path::PathBuf;

use netdiag_core::application::constants::DEFAULT_CHANNEL_CAPACITY;

const ENV_PREFIX: &str = "NETDIAG";

/// Log output format on stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// `NETDIAG_LOG_FORMAT`
    pub log_format: LogFormat,
    /// `NETDIAG_LOG_DIR`: also write JSON logs to a daily-rolling file here
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// `NETDIAG_CHANNEL_CAPACITY`
    pub channel_capacity: usize,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("log_format", "pretty")?
            .set_default("channel_capacity", DEFAULT_CHANNEL_CAPACITY as u64)?
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
