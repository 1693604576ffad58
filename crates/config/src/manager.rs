//! Configuration manager
//!
//! Wraps the `config` crate. Sources are applied in increasing priority:
//! defaults, configuration file, environment, overrides.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use parking_lot::RwLock;
use tracing::debug;

use common::error::{Error, Result};

use crate::defaults::{DEFAULTS, ENV_PREFIX};

/// Layered configuration lookup
pub struct ConfigManager {
    /// Optional configuration file
    file: Option<PathBuf>,

    /// Whether `GM_*` environment variables are read
    use_env: bool,

    /// Explicit overrides, usually from command-line flags
    overrides: RwLock<BTreeMap<String, String>>,

    /// Merged configuration
    config: RwLock<Config>,
}

impl ConfigManager {
    /// Creates a configuration manager reading defaults and the environment
    pub fn new() -> Result<Self> {
        Self::create(None, true)
    }

    /// Creates a configuration manager that also reads the given file
    pub fn with_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::create(Some(path.as_ref().to_path_buf()), true)
    }

    /// Creates a configuration manager that ignores the environment
    pub fn isolated() -> Result<Self> {
        Self::create(None, false)
    }

    fn create(file: Option<PathBuf>, use_env: bool) -> Result<Self> {
        let config = Self::build(file.as_deref(), use_env, &BTreeMap::new())?;

        Ok(Self {
            file,
            use_env,
            overrides: RwLock::new(BTreeMap::new()),
            config: RwLock::new(config),
        })
    }

    fn build(
        file: Option<&Path>,
        use_env: bool,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Config> {
        let mut builder = Config::builder();

        for (key, value) in DEFAULTS {
            builder = builder.set_default(*key, *value).map_err(config_error)?;
        }

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        if use_env {
            builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));
        }

        for (key, value) in overrides {
            builder = builder
                .set_override(key.as_str(), value.as_str())
                .map_err(config_error)?;
        }

        builder.build().map_err(config_error)
    }

    /// Sets an override that takes priority over every other source
    pub fn set_override(&self, key: &str, value: impl Into<String>) -> Result<()> {
        let mut overrides = self.overrides.write();
        overrides.insert(key.to_string(), value.into());

        let config = Self::build(self.file.as_deref(), self.use_env, &overrides)?;
        *self.config.write() = config;

        debug!("Configuration override set for {}", key);

        Ok(())
    }

    /// Gets a string value
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.config.read().get_string(key).map_err(config_error)
    }

    /// Gets a string value, treating an empty string as absent
    pub fn get_optional_string(&self, key: &str) -> Option<String> {
        self.get_string(key).ok().filter(|value| !value.is_empty())
    }

    /// Gets an unsigned 32-bit integer value
    pub fn get_u32(&self, key: &str) -> Result<u32> {
        self.config.read().get::<u32>(key).map_err(config_error)
    }

    /// Gets a duration. Accepts plain seconds (`30`) or humantime syntax (`30s`, `365days`).
    pub fn get_duration(&self, key: &str) -> Result<Duration> {
        let raw = self.get_string(key)?;
        parse_duration(&raw).map_err(|e| Error::Config(format!("invalid duration for {}: {}", key, e)))
    }
}

fn parse_duration(raw: &str) -> std::result::Result<Duration, humantime::DurationError> {
    let raw = raw.trim();
    match raw.parse::<u64>() {
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => humantime::parse_duration(raw),
    }
}

fn config_error(err: config::ConfigError) -> Error {
    Error::Config(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let manager = ConfigManager::isolated().unwrap();
        assert_eq!(manager.get_string("master").unwrap(), "127.0.0.1:5050");
        assert_eq!(manager.get_string("storage").unwrap(), "file:/tmp/gonsumer.json");
        assert_eq!(manager.get_u32("reconcile_max_tries").unwrap(), 3);
        assert_eq!(
            manager.get_duration("framework_timeout").unwrap(),
            Duration::from_secs(365 * 24 * 60 * 60)
        );
        assert_eq!(manager.get_optional_string("api"), None);
    }

    #[test]
    fn test_overrides_take_priority() {
        let manager = ConfigManager::isolated().unwrap();
        manager.set_override("storage", "zk:localhost:2181/gonsumer").unwrap();
        manager.set_override("reconcile_delay", "45").unwrap();

        assert_eq!(manager.get_string("storage").unwrap(), "zk:localhost:2181/gonsumer");
        assert_eq!(manager.get_duration("reconcile_delay").unwrap(), Duration::from_secs(45));
    }

    #[test]
    fn test_file_source() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "master = \"10.0.0.1:5050\"\nframework_name = \"orders\"").unwrap();

        let manager = ConfigManager::with_file(file.path()).unwrap();
        assert_eq!(manager.get_string("master").unwrap(), "10.0.0.1:5050");
        assert_eq!(manager.get_string("framework_name").unwrap(), "orders");

        manager.set_override("framework_name", "payments").unwrap();
        assert_eq!(manager.get_string("framework_name").unwrap(), "payments");
    }

    #[test]
    fn test_invalid_duration() {
        let manager = ConfigManager::isolated().unwrap();
        manager.set_override("storage_timeout", "soon").unwrap();
        assert!(manager.get_duration("storage_timeout").is_err());
    }
}
