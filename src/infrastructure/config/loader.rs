//! Layered configuration loading (spec §6): defaults, project config,
//! local overrides, then environment variables, in increasing priority.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types surfaced after loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid concurrency_limit: {0}. must be at least 1")]
    InvalidConcurrencyLimit(usize),

    #[error("invalid log level: {0}. must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid log format: {0}. must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("database path cannot be empty")]
    EmptyDatabasePath,

    #[error("invalid max_connections: {0}. must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("invalid granularity bounds: min_task_complexity ({0}) must be less than max_task_complexity ({1})")]
    InvalidComplexityBounds(f64, f64),

    #[error("invalid reviewer max_retries: {0}. cannot be 0")]
    InvalidMaxRetries(u32),
}

/// Loads [`Config`] with figment's hierarchical merge, project-local
/// config always taking precedence over defaults, and env vars always
/// winning over files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from the project's `.abathur/` directory,
    /// merging in environment variable overrides.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. `.abathur/config.yaml` (written by `init`)
    /// 3. `.abathur/local.yaml` (optional, untracked overrides)
    /// 4. `ABATHUR_*` environment variables
    ///
    /// # Errors
    /// Fails if the merged configuration cannot be deserialized, or
    /// fails validation.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".abathur/config.yaml"))
            .merge(Yaml::file(".abathur/local.yaml"))
            .merge(Env::prefixed("ABATHUR_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, without environment
    /// variable overrides. Used by tests and the `--config` CLI flag.
    ///
    /// # Errors
    /// Fails if the file cannot be parsed, or fails validation.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate a loaded configuration.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] variant whose invariant is violated.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.scheduler.concurrency_limit == 0 {
            return Err(ConfigError::InvalidConcurrencyLimit(
                config.scheduler.concurrency_limit,
            ));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.granularity.min_task_complexity >= config.granularity.max_task_complexity {
            return Err(ConfigError::InvalidComplexityBounds(
                config.granularity.min_task_complexity,
                config.granularity.max_task_complexity,
            ));
        }

        if config.reviewer.enabled && config.reviewer.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries(config.reviewer.max_retries));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        ConfigLoader::validate(&config).expect("default config should be valid");
    }

    #[test]
    fn yaml_overrides_defaults() {
        let yaml = r"
scheduler:
  concurrency_limit: 8
logging:
  level: debug
  format: pretty
";
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(figment::providers::Yaml::string(yaml))
            .extract()
            .unwrap();
        assert_eq!(config.scheduler.concurrency_limit, 8);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        ConfigLoader::validate(&config).unwrap();
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.scheduler.concurrency_limit = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidConcurrencyLimit(0))
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn validate_rejects_inverted_complexity_bounds() {
        let mut config = Config::default();
        config.granularity.min_task_complexity = 80.0;
        config.granularity.max_task_complexity = 20.0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidComplexityBounds(_, _))
        ));
    }

    #[test]
    fn env_override_precedence() {
        unsafe {
            env::set_var("ABATHUR_SCHEDULER__CONCURRENCY_LIMIT", "16");
        }
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::prefixed("ABATHUR_").split("__"))
            .extract()
            .unwrap();
        assert_eq!(config.scheduler.concurrency_limit, 16);
        unsafe {
            env::remove_var("ABATHUR_SCHEDULER__CONCURRENCY_LIMIT");
        }
    }
}
