//! Configuration for the thruster feedback poller.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use t100_telemetry_common::config::LoggingConfig;
use t100_telemetry_common::serialization::Format;

use crate::bus::{MAX_DEVICE_ADDRESS, MIN_DEVICE_ADDRESS, is_valid_address};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete poller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Bus adapter settings.
    pub bus: BusConfig,

    /// Thrusters to poll.
    pub thrusters: Vec<ThrusterConfig>,

    /// Poll rate in Hz (default: 15).
    #[serde(default = "default_poll_rate_hz")]
    pub poll_rate_hz: u32,

    /// What to do with measurement fields while an ESC is disconnected.
    #[serde(default)]
    pub on_disconnect: DisconnectPolicy,

    /// Serialization format for emitted samples.
    #[serde(default)]
    pub serialization: Format,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_poll_rate_hz() -> u32 {
    15
}

/// Bus adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// I2C adapter device path (e.g., "/dev/i2c-1").
    #[serde(default = "default_bus_device")]
    pub device: String,
}

fn default_bus_device() -> String {
    "/dev/i2c-1".to_string()
}

/// Configuration for a single thruster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrusterConfig {
    /// Thruster label used in emitted samples (e.g., "port_fore").
    pub name: String,

    /// 7-bit I2C address of the ESC. JSON5 accepts hex literals, so
    /// `0x29` works directly.
    pub address: u8,
}

/// Handling of retained measurement fields while disconnected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisconnectPolicy {
    /// Keep the last-known readings in the sample (matches the ESC's
    /// original reporting behavior).
    #[default]
    Hold,
    /// Zero rpm/voltage/current and clear the temperature.
    Zero,
}

impl FeedbackConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: FeedbackConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thrusters.is_empty() {
            return Err(ConfigError::Validation(
                "At least one thruster must be configured".to_string(),
            ));
        }

        if self.poll_rate_hz == 0 || self.poll_rate_hz > 100 {
            return Err(ConfigError::Validation(format!(
                "poll_rate_hz must be 1-100, got {}",
                self.poll_rate_hz
            )));
        }

        let mut names = HashSet::new();
        let mut addresses = HashSet::new();

        for thruster in &self.thrusters {
            if thruster.name.is_empty() {
                return Err(ConfigError::Validation(
                    "Thruster name cannot be empty".to_string(),
                ));
            }

            if !names.insert(thruster.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate thruster name '{}'",
                    thruster.name
                )));
            }

            if !is_valid_address(thruster.address) {
                return Err(ConfigError::Validation(format!(
                    "Thruster '{}': address 0x{:02x} outside valid 7-bit range 0x{:02x}-0x{:02x}",
                    thruster.name, thruster.address, MIN_DEVICE_ADDRESS, MAX_DEVICE_ADDRESS
                )));
            }

            if !addresses.insert(thruster.address) {
                return Err(ConfigError::Validation(format!(
                    "Thruster '{}': duplicate address 0x{:02x}",
                    thruster.name, thruster.address
                )));
            }
        }

        Ok(())
    }
}
