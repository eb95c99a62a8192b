//! Register bus abstraction.
//!
//! The poller only needs byte-wide register reads from a 7-bit device
//! address. [`I2cBus`] implements that over the Linux `/dev/i2c-*`
//! character device; [`MockBus`] provides a scripted in-memory bus for
//! tests.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors from bus transactions.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Failed to open bus device '{device}': {source}")]
    Open {
        device: String,
        source: std::io::Error,
    },

    #[error("Failed to select device 0x{address:02x}: {source}")]
    AddressSelect {
        address: u8,
        source: std::io::Error,
    },

    #[error("Read of register 0x{register:02x} on device 0x{address:02x} failed: {source}")]
    Read {
        address: u8,
        register: u8,
        source: std::io::Error,
    },

    #[error("Short read of register 0x{register:02x} on device 0x{address:02x}")]
    ShortRead { address: u8, register: u8 },
}

/// Byte-level register access to devices on a shared bus.
///
/// Implementations are not required to be thread-safe; callers sharing a
/// bus across pollers must serialize access through a mutex.
pub trait RegisterBus: Send {
    /// Read one byte-wide register from the device at a 7-bit address.
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError>;
}

/// Lowest valid 7-bit I2C device address (below are reserved).
pub const MIN_DEVICE_ADDRESS: u8 = 0x08;
/// Highest valid 7-bit I2C device address.
pub const MAX_DEVICE_ADDRESS: u8 = 0x77;

/// Whether an address is a valid, non-reserved 7-bit I2C address.
pub fn is_valid_address(address: u8) -> bool {
    (MIN_DEVICE_ADDRESS..=MAX_DEVICE_ADDRESS).contains(&address)
}

/// Linux I2C character device backend.
///
/// Selects the slave with the `I2C_SLAVE` ioctl, then reads a register by
/// writing the register offset and reading one byte back.
#[cfg(target_os = "linux")]
pub struct I2cBus {
    file: std::fs::File,
    device: String,
    selected: Option<u8>,
}

#[cfg(target_os = "linux")]
const I2C_SLAVE: libc::c_ulong = 0x0703;

#[cfg(target_os = "linux")]
impl I2cBus {
    /// Open an I2C adapter, e.g. `/dev/i2c-1`.
    pub fn open(device: &str) -> Result<Self, BusError> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(device)
            .map_err(|source| BusError::Open {
                device: device.to_string(),
                source,
            })?;

        Ok(Self {
            file,
            device: device.to_string(),
            selected: None,
        })
    }

    /// Path of the underlying adapter device.
    pub fn device(&self) -> &str {
        &self.device
    }

    fn select(&mut self, address: u8) -> Result<(), BusError> {
        if self.selected == Some(address) {
            return Ok(());
        }

        let rc = unsafe {
            use std::os::unix::io::AsRawFd;
            libc::ioctl(self.file.as_raw_fd(), I2C_SLAVE, address as libc::c_ulong)
        };
        if rc < 0 {
            return Err(BusError::AddressSelect {
                address,
                source: std::io::Error::last_os_error(),
            });
        }

        self.selected = Some(address);
        Ok(())
    }
}

#[cfg(target_os = "linux")]
impl RegisterBus for I2cBus {
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        use std::io::{Read, Write};

        self.select(address)?;

        self.file
            .write_all(&[register])
            .map_err(|source| BusError::Read {
                address,
                register,
                source,
            })?;

        let mut buf = [0u8; 1];
        let n = self
            .file
            .read(&mut buf)
            .map_err(|source| BusError::Read {
                address,
                register,
                source,
            })?;
        if n != 1 {
            return Err(BusError::ShortRead { address, register });
        }

        Ok(buf[0])
    }
}

/// Scripted in-memory bus for tests.
///
/// Registers default to 0 unless set; individual registers can be marked
/// as failing to exercise bus-error paths. Every read is logged so tests
/// can assert which registers a poll cycle touched.
#[derive(Debug, Default)]
pub struct MockBus {
    registers: HashMap<(u8, u8), u8>,
    failing: HashSet<(u8, u8)>,
    reads: Vec<(u8, u8)>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single register value.
    pub fn set_register(&mut self, address: u8, register: u8, value: u8) {
        self.registers.insert((address, register), value);
    }

    /// Set a big-endian register pair.
    pub fn set_pair(&mut self, address: u8, high_register: u8, low_register: u8, value: u16) {
        self.set_register(address, high_register, (value >> 8) as u8);
        self.set_register(address, low_register, (value & 0xFF) as u8);
    }

    /// Make reads of one register fail with a timeout error.
    pub fn fail_register(&mut self, address: u8, register: u8) {
        self.failing.insert((address, register));
    }

    /// Clear a previously injected failure.
    pub fn restore_register(&mut self, address: u8, register: u8) {
        self.failing.remove(&(address, register));
    }

    /// Registers read so far, in order.
    pub fn reads(&self) -> &[(u8, u8)] {
        &self.reads
    }

    /// Forget the read log.
    pub fn clear_reads(&mut self) {
        self.reads.clear();
    }
}

impl RegisterBus for MockBus {
    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusError> {
        self.reads.push((address, register));

        if self.failing.contains(&(address, register)) {
            return Err(BusError::Read {
                address,
                register,
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "injected bus fault"),
            });
        }

        Ok(self.registers.get(&(address, register)).copied().unwrap_or(0))
    }
}
