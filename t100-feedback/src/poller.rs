//! Thruster polling and telemetry production.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use t100_telemetry_common::telemetry::{LinkStatus, TelemetrySample, current_timestamp_millis};

use crate::bus::{BusError, RegisterBus};
use crate::config::{DisconnectPolicy, ThrusterConfig};
use crate::convert;
use crate::liveness::LivenessTracker;
use crate::registers;
use crate::sink::TelemetrySink;

/// Polls one thruster's feedback registers and produces unit-converted
/// samples.
///
/// The bus is shared between all pollers on the same adapter; one tick
/// takes the bus mutex once and performs the whole register sequence
/// under it, so cycles from different thrusters never interleave on the
/// wire.
pub struct ThrusterPoller<B> {
    name: String,
    address: u8,
    bus: Arc<Mutex<B>>,
    on_disconnect: DisconnectPolicy,
    sample: TelemetrySample,
    rpm_timer: Option<Instant>,
}

impl<B: RegisterBus> ThrusterPoller<B> {
    /// Create a poller for one configured thruster.
    pub fn new(
        config: &ThrusterConfig,
        bus: Arc<Mutex<B>>,
        on_disconnect: DisconnectPolicy,
    ) -> Self {
        Self {
            name: config.name.clone(),
            address: config.address,
            bus,
            on_disconnect,
            sample: TelemetrySample::new(config.name.clone(), config.address),
            rpm_timer: None,
        }
    }

    /// Thruster label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Perform a single poll cycle and return the resulting sample.
    ///
    /// Never fails: a bus error marks the cycle disconnected and is
    /// retried naturally on the next tick.
    pub fn poll_once(&mut self) -> TelemetrySample {
        if let Err(e) = self.read_cycle() {
            // Fail-safe: never report a stale Connected on a bus error.
            warn!(device = %self.name, error = %e, "Bus read failed, marking disconnected");
            self.mark_disconnected();
        }

        self.sample.timestamp = current_timestamp_millis();
        self.sample.clone()
    }

    fn read_cycle(&mut self) -> Result<(), BusError> {
        let mut bus = lock(&self.bus);

        let alive = bus.read_register(self.address, registers::ALIVE)?;
        if alive == 0 {
            drop(bus);
            self.mark_disconnected();
            return Ok(());
        }

        let pulse = read_pair(
            &mut *bus,
            self.address,
            registers::PULSE_COUNT_HIGH,
            registers::PULSE_COUNT_LOW,
        )?;
        let temp_raw = read_pair(
            &mut *bus,
            self.address,
            registers::TEMPERATURE_HIGH,
            registers::TEMPERATURE_LOW,
        )?;
        let volt_raw = read_pair(
            &mut *bus,
            self.address,
            registers::VOLTAGE_HIGH,
            registers::VOLTAGE_LOW,
        )?;
        let curr_raw = read_pair(
            &mut *bus,
            self.address,
            registers::CURRENT_HIGH,
            registers::CURRENT_LOW,
        )?;
        drop(bus);

        // Monotonic clock for the pulse-count window; wall time only
        // goes into the sample timestamp.
        let now = Instant::now();
        let elapsed = self
            .rpm_timer
            .map(|t| (now - t).as_secs_f64())
            .unwrap_or(0.0);
        self.sample.rpm = convert::rpm(pulse, elapsed);
        self.rpm_timer = Some(now);

        self.sample.temperature_c = convert::temperature(temp_raw);
        if self.sample.temperature_c.is_none() {
            warn!(device = %self.name, raw = temp_raw, "Thermistor reading at ADC rail, reporting fault");
        }

        self.sample.voltage_v = convert::voltage(volt_raw);
        self.sample.current_a = convert::current(curr_raw);
        self.sample.status = LinkStatus::Connected;

        Ok(())
    }

    fn mark_disconnected(&mut self) {
        if self.on_disconnect == DisconnectPolicy::Zero {
            self.sample.rpm = 0.0;
            self.sample.temperature_c = None;
            self.sample.voltage_v = 0.0;
            self.sample.current_a = 0.0;
        }
        self.sample.status = LinkStatus::Disconnected;
    }

    /// Run the polling loop at a fixed rate until shutdown.
    ///
    /// Uses a fixed-rate interval rather than a fixed-delay sleep so the
    /// tick cadence does not drift with cycle duration; register reads
    /// are microsecond-scale and done inline on the task. Shutdown is
    /// honored between ticks only, never mid-transaction.
    pub async fn run(
        mut self,
        rate_hz: u32,
        sink: Arc<dyn TelemetrySink>,
        liveness: Arc<Mutex<LivenessTracker>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            device = %self.name,
            address = self.address,
            rate_hz,
            "Starting thruster poller"
        );

        let mut ticker = tokio::time::interval(Duration::from_secs_f64(1.0 / rate_hz as f64));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let sample = self.poll_once();
                    self.note_transition(&liveness, sample.status);

                    if let Err(e) = sink.publish(&sample) {
                        warn!(device = %self.name, error = %e, "Failed to publish sample");
                    } else {
                        debug!(device = %self.name, status = %sample.status, rpm = sample.rpm, "Published sample");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(device = %self.name, "Stopping thruster poller");
                        break;
                    }
                }
            }
        }
    }

    fn note_transition(&self, liveness: &Mutex<LivenessTracker>, status: LinkStatus) {
        let mut tracker = lock(liveness);
        if tracker.record(&self.name, status).is_some() {
            match status {
                LinkStatus::Connected => {
                    info!(device = %self.name, "Thruster connected");
                }
                LinkStatus::Disconnected => {
                    warn!(device = %self.name, "Thruster disconnected");
                }
            }
        }
    }
}

/// Read a big-endian register pair.
fn read_pair<B: RegisterBus>(
    bus: &mut B,
    address: u8,
    high_register: u8,
    low_register: u8,
) -> Result<u16, BusError> {
    let high = bus.read_register(address, high_register)?;
    let low = bus.read_register(address, low_register)?;
    Ok(registers::combine(high, low))
}

/// Lock a mutex, recovering the inner value if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
