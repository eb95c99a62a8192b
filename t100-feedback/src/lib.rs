//! T100 thruster feedback poller.
//!
//! Polls the I2C-mapped feedback registers of BlueRobotics T100 thrusters
//! (BlueESC firmware) at a fixed rate, converts the raw register pairs to
//! physical units, and hands each sample to a telemetry sink.
//!
//! Each thruster is one [`poller::ThrusterPoller`] ticking on its own task;
//! all pollers on the same physical bus share one [`bus::RegisterBus`]
//! behind a mutex, because I2C adapters do not tolerate interleaved
//! transactions from multiple owners.

pub mod bus;
pub mod config;
pub mod convert;
pub mod liveness;
pub mod poller;
pub mod registers;
pub mod sink;
