//! Configuration
//!
//! Loads the bot configuration from a JSON5 file, then applies `POLLBOT_*`
//! environment overrides. Every field has a default, so a missing file is
//! not an error.

pub mod schema;

use crate::polls::{PollSettings, VoteScope};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "POLLBOT_CONFIG";
pub const MAX_VOTES_ENV: &str = "POLLBOT_MAX_VOTES";
pub const SWEEP_INTERVAL_ENV: &str = "POLLBOT_SWEEP_INTERVAL";
pub const VOTE_SCOPE_ENV: &str = "POLLBOT_VOTE_SCOPE";
pub const REPLACE_ACTIVE_POLL_ENV: &str = "POLLBOT_REPLACE_ACTIVE_POLL";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollBotConfig {
    /// Votes each participant may cast
    pub max_votes_per_participant: u32,
    /// Seconds between expiration sweeps
    pub sweep_interval_seconds: u64,
    /// Whether vote allowances reset per poll or last the whole process
    pub vote_scope: VoteScope,
    /// Replace a running poll on `!poll` instead of rejecting it
    pub replace_active_poll: bool,
    pub logging: LoggingConfig,
}

impl Default for PollBotConfig {
    fn default() -> Self {
        Self {
            max_votes_per_participant: crate::polls::engine::DEFAULT_MAX_VOTES_PER_PARTICIPANT,
            sweep_interval_seconds: crate::polls::sweeper::DEFAULT_SWEEP_INTERVAL.as_secs(),
            vote_scope: VoteScope::Poll,
            replace_active_poll: false,
            logging: LoggingConfig::default(),
        }
    }
}

impl PollBotConfig {
    /// Parse configuration from JSON5 text
    pub fn from_json5(raw: &str, origin: &str) -> Result<Self, ConfigError> {
        json5::from_str(raw).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Settings handed to the poll engine
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            max_votes_per_participant: self.max_votes_per_participant,
            vote_scope: self.vote_scope,
            replace_active_poll: self.replace_active_poll,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// Apply overrides from a variable lookup (normally the process environment)
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup(MAX_VOTES_ENV) {
            self.max_votes_per_participant = parse_env(MAX_VOTES_ENV, &raw)?;
        }
        if let Some(raw) = lookup(SWEEP_INTERVAL_ENV) {
            self.sweep_interval_seconds = parse_env(SWEEP_INTERVAL_ENV, &raw)?;
        }
        if let Some(raw) = lookup(VOTE_SCOPE_ENV) {
            self.vote_scope = match raw.trim().to_ascii_lowercase().as_str() {
                "poll" => VoteScope::Poll,
                "process" => VoteScope::Process,
                other => {
                    return Err(ConfigError::Invalid {
                        key: VOTE_SCOPE_ENV.to_string(),
                        message: format!("expected 'poll' or 'process', got '{}'", other),
                    })
                }
            };
        }
        if let Some(raw) = lookup(REPLACE_ACTIVE_POLL_ENV) {
            self.replace_active_poll = parse_env(REPLACE_ACTIVE_POLL_ENV, &raw)?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_votes_per_participant == 0 {
            return Err(ConfigError::Invalid {
                key: "maxVotesPerParticipant".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.sweep_interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "sweepIntervalSeconds".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        let max_interval = crate::polls::MAX_SWEEP_INTERVAL.as_secs();
        if self.sweep_interval_seconds > max_interval {
            return Err(ConfigError::Invalid {
                key: "sweepIntervalSeconds".to_string(),
                message: format!("must be at most {}", max_interval),
            });
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "logging.level".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Resolve the config file path.
///
/// `$POLLBOT_CONFIG` wins; otherwise `<config dir>/pollbot/config.json5`.
pub fn default_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("pollbot")
        .join("config.json5")
}

/// Read a config file, falling back to defaults when it does not exist.
///
/// Environment overrides are not applied.
pub fn read_config_file(path: &Path) -> Result<PollBotConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => PollBotConfig::from_json5(&raw, &path.display().to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(PollBotConfig::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Load, override from the environment, and validate
pub fn load_config(path: Option<&Path>) -> Result<PollBotConfig, ConfigError> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_config_path);
    let mut config = read_config_file(&path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}
