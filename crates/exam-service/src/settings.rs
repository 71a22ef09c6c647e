//! Layered service settings
//!
//! Built-in defaults, then an optional `proctor.{toml,yaml,json}` file, then
//! `PROCTOR__*` environment variables (`__` separates nested keys, e.g.
//! `PROCTOR__PROCTORING__ALERTS__THRESHOLD=5`).

use std::path::Path;

use config::{Config, Environment, File, Map};
use proctoring::ProctoringConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{RateLimitConfig, ServiceError};

/// Service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub bind_addr: String,
    /// JSON log lines instead of human-readable ones
    pub log_json: bool,
    /// Applied to the join, attempt and submission routes
    pub rate_limit: RateLimitConfig,
    pub proctoring: ProctoringConfig,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            log_json: false,
            rate_limit: RateLimitConfig::default(),
            proctoring: ProctoringConfig::default(),
        }
    }
}

impl ServiceSettings {
    /// Load from `proctor.*` in the working directory and the process environment
    pub fn load() -> Result<Self, ServiceError> {
        Self::layered(File::with_name("proctor").required(false), None)
    }

    /// Load from an explicit file and environment map
    pub fn load_from(path: &Path, env: Map<String, String>) -> Result<Self, ServiceError> {
        Self::layered(File::from(path).required(false), Some(env))
    }

    fn layered<F>(file: F, env: Option<Map<String, String>>) -> Result<Self, ServiceError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        let defaults = Config::try_from(&Self::default()).map_err(config_error)?;
        let settings: Self = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                Environment::with_prefix("PROCTOR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error)?;

        debug!(bind_addr = %settings.bind_addr, "Settings loaded");
        Ok(settings)
    }
}

fn config_error(e: config::ConfigError) -> ServiceError {
    ServiceError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file_or_env() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ServiceSettings::load_from(&dir.path().join("missing.toml"), Map::new()).unwrap();
        assert_eq!(settings.bind_addr, "0.0.0.0:8080");
        assert_eq!(settings.proctoring.alerts.threshold, 10);
        assert_eq!(settings.rate_limit, RateLimitConfig::default());
    }

    #[test]
    fn test_file_then_env_layering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proctor.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "bind_addr = \"127.0.0.1:9000\"\n\n[proctoring.alerts]\nthreshold = 4\n\n[rate_limit]\nburst_size = 8"
        )
        .unwrap();

        let mut env = Map::new();
        env.insert("PROCTOR__PROCTORING__ALERTS__THRESHOLD".to_string(), "3".to_string());
        env.insert("PROCTOR__LOG_JSON".to_string(), "true".to_string());

        let settings = ServiceSettings::load_from(&path, env).unwrap();
        assert_eq!(settings.bind_addr, "127.0.0.1:9000");
        assert_eq!(settings.proctoring.alerts.threshold, 3);
        assert!(settings.log_json);
        assert_eq!(settings.rate_limit.burst_size, 8);
        // untouched neighbours keep their defaults
        assert_eq!(settings.proctoring.alerts.snapshot_interval, 5);
        assert_eq!(settings.rate_limit.per_second, 2);
    }

    #[test]
    fn test_bad_value_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = Map::new();
        env.insert("PROCTOR__PROCTORING__ALERTS__THRESHOLD".to_string(), "lots".to_string());
        let err = ServiceSettings::load_from(&dir.path().join("none.toml"), env).unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }
}
