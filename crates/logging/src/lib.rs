//! Logging for Group Orchestrator
//!
//! Installs the global `tracing` subscriber. `RUST_LOG` wins over the
//! configured level when it is set.

use tracing_subscriber::{fmt, EnvFilter};

use common::error::{Error, Result};
use config::ConfigManager;

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive, e.g. `info` or `orchestrator_core=debug`
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LogConfig {
    /// Reads `log_level` and `log_format` from the configuration
    pub fn from_config(config_manager: &ConfigManager) -> Self {
        let defaults = Self::default();

        let level = config_manager
            .get_string("log_level")
            .unwrap_or(defaults.level);

        let format = match config_manager
            .get_string("log_format")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self { level, format }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Initializes the global subscriber
pub fn init(config: &LogConfig) -> Result<()> {
    let builder = fmt().with_env_filter(config.filter()).with_target(true);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    installed.map_err(|e| Error::Internal(format!("failed to install log subscriber: {}", e)))
}
