//! Raw register to physical unit conversions.
//!
//! Scale factors and the thermistor arrangement come from the BlueESC
//! feedback documentation: a 10 kΩ NTC thermistor (B = 3900) in a voltage
//! divider against a 3.3 kΩ series resistor, read by a 16-bit ADC.

/// Resistance of the divider's series resistor, ohms.
const SERIES_RESISTOR: f64 = 3300.0;
/// Thermistor resistance at the nominal temperature, ohms.
const THERMISTOR_NOMINAL: f64 = 10000.0;
/// Thermistor beta coefficient.
const B_COEFFICIENT: f64 = 3900.0;
/// Nominal temperature, degrees Celsius.
const TEMPERATURE_NOMINAL: f64 = 25.0;
/// Offset between Kelvin and Celsius.
const KELVIN_OFFSET: f64 = 273.15;

/// Volts per ADC count.
const VOLTAGE_SCALE: f64 = 0.0004921;
/// Amps per ADC count.
const CURRENT_SCALE: f64 = 0.001122;
/// Raw current reading at zero amps; lower values are reverse current.
const CURRENT_MIDPOINT: f64 = 32767.0;

/// Pulses counted per revolution times poles (BlueESC counts 120 per rev
/// per second at the feedback rate).
const PULSES_PER_REV: f64 = 120.0;

/// Convert a raw voltage register value to volts.
pub fn voltage(raw: u16) -> f64 {
    raw as f64 * VOLTAGE_SCALE
}

/// Convert a raw current register value to amps.
///
/// The reading is centered on 32767; values below it are negative
/// (reverse) current.
pub fn current(raw: u16) -> f64 {
    (raw as f64 - CURRENT_MIDPOINT) * CURRENT_SCALE
}

/// Convert a raw thermistor reading to degrees Celsius via the
/// Steinhart-Hart beta approximation.
///
/// Returns `None` when the reading sits at either ADC rail (0 or 65535),
/// where the divider equation divides by zero. Callers report that as a
/// sensor fault rather than propagating NaN.
pub fn temperature(raw: u16) -> Option<f64> {
    if raw == 0 || raw == u16::MAX {
        return None;
    }

    let resistance = SERIES_RESISTOR / (65535.0 / raw as f64 - 1.0);
    let mut steinhart = (resistance / THERMISTOR_NOMINAL).ln();
    steinhart /= B_COEFFICIENT;
    steinhart += 1.0 / (TEMPERATURE_NOMINAL + KELVIN_OFFSET);
    Some(1.0 / steinhart - KELVIN_OFFSET)
}

/// Compute RPM from a pulse count and the elapsed time since the previous
/// pulse reading.
///
/// Returns 0.0 when the elapsed time is not strictly positive (first tick
/// after startup, or a clock that has not advanced).
pub fn rpm(pulse_count: u16, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 {
        return 0.0;
    }
    pulse_count as f64 / (elapsed_secs * PULSES_PER_REV) * 60.0
}
