use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Link state of a thruster ESC as reported by its alive register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    /// The ESC answered its alive register with a nonzero value.
    Connected,
    /// The ESC reported dead, or a bus transaction failed this cycle.
    ///
    /// Fail-safe default: a thruster is not considered present until the
    /// first successful poll.
    #[default]
    Disconnected,
}

impl std::fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkStatus::Connected => write!(f, "connected"),
            LinkStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// One unit-converted feedback sample from a single thruster.
///
/// Produced once per poll cycle. When `status` is
/// [`LinkStatus::Disconnected`] the measurement fields carry either the
/// last-known readings or zeros depending on the configured disconnect
/// policy; consumers must check `status` before trusting them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetrySample {
    /// Unix epoch milliseconds when the sample was taken.
    pub timestamp: i64,

    /// Human-readable thruster label (e.g., "port_fore").
    pub device: String,

    /// 7-bit I2C address of the ESC.
    pub address: u8,

    /// Propeller speed in revolutions per minute.
    pub rpm: f64,

    /// ESC temperature in degrees Celsius.
    ///
    /// `None` when the thermistor reading sat at either ADC rail (raw 0
    /// or 65535), which makes the conversion undefined. Reported as a
    /// sensor fault instead of NaN.
    pub temperature_c: Option<f64>,

    /// Supply voltage in volts.
    pub voltage_v: f64,

    /// Motor current in amps. Signed: negative values indicate reverse
    /// current flow.
    pub current_a: f64,

    /// Link state for this cycle.
    pub status: LinkStatus,
}

impl TelemetrySample {
    /// Create an empty sample for a device that has never been polled.
    pub fn new(device: impl Into<String>, address: u8) -> Self {
        Self {
            timestamp: 0,
            device: device.into(),
            address,
            rpm: 0.0,
            temperature_c: None,
            voltage_v: 0.0,
            current_a: 0.0,
            status: LinkStatus::Disconnected,
        }
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch (should never happen in practice).
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
