use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::{Error, Result};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Load a configuration file in JSON5 format.
pub fn load_config<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        warn!("Failed to read config file '{}': {}", path.display(), e);
        Error::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    json5::from_str(&content).map_err(|e| {
        warn!("Failed to parse config file '{}': {}", path.display(), e);
        Error::Config(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Load a configuration from a JSON5 string.
pub fn parse_config<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T> {
    json5::from_str(content).map_err(|e| {
        warn!("Failed to parse config: {}", e);
        Error::Config(format!("Failed to parse config: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_logging_config() {
        let json5 = r#"
        {
            level: "debug",
            format: "json",
        }
        "#;

        let config: LoggingConfig = parse_config(json5).unwrap();

        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_default_logging_config() {
        let config: LoggingConfig = parse_config("{}").unwrap();

        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn test_parse_error_is_config_error() {
        let result: Result<LoggingConfig> = parse_config("{ level: ");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result: Result<LoggingConfig> = load_config("/nonexistent/t100-test.json5");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
