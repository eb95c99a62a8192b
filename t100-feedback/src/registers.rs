//! BlueESC feedback register map.
//!
//! Each measured quantity is exposed as a big-endian pair of byte-wide
//! registers; the alive register is a single byte whose nonzero value
//! means the ESC is present and responding.

/// Pulse counter, high byte.
pub const PULSE_COUNT_HIGH: u8 = 0x02;
/// Pulse counter, low byte.
pub const PULSE_COUNT_LOW: u8 = 0x03;
/// Supply voltage, high byte.
pub const VOLTAGE_HIGH: u8 = 0x04;
/// Supply voltage, low byte.
pub const VOLTAGE_LOW: u8 = 0x05;
/// Thermistor reading, high byte.
pub const TEMPERATURE_HIGH: u8 = 0x06;
/// Thermistor reading, low byte.
pub const TEMPERATURE_LOW: u8 = 0x07;
/// Motor current, high byte.
pub const CURRENT_HIGH: u8 = 0x08;
/// Motor current, low byte.
pub const CURRENT_LOW: u8 = 0x09;
/// Liveness flag, single byte.
pub const ALIVE: u8 = 0x0A;

/// Combine a big-endian register pair into an unsigned 16-bit value.
pub fn combine(high: u8, low: u8) -> u16 {
    ((high as u16) << 8) | low as u16
}
