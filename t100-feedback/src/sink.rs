//! Telemetry sinks.
//!
//! The poller hands each sample to a [`TelemetrySink`]; what happens to
//! it afterwards (stdout, another task, a transport) is not the poller's
//! concern. Publish failures are reported but never fatal to the loop.

use std::io::Write;
use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::mpsc;

use t100_telemetry_common::serialization::{Format, encode};
use t100_telemetry_common::telemetry::TelemetrySample;

/// Errors from publishing a sample.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Serialization error: {0}")]
    Encode(#[from] t100_telemetry_common::Error),

    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink channel closed")]
    Closed,
}

/// Destination for telemetry samples.
pub trait TelemetrySink: Send + Sync {
    /// Publish one sample.
    fn publish(&self, sample: &TelemetrySample) -> Result<(), SinkError>;
}

/// Writes newline-delimited encoded samples to any [`Write`].
///
/// With `Format::Json` this produces JSON Lines output suitable for
/// piping into downstream tooling.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
    format: Format,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W, format: Format) -> Self {
        Self {
            writer: Mutex::new(writer),
            format,
        }
    }
}

impl<W: Write + Send> TelemetrySink for WriterSink<W> {
    fn publish(&self, sample: &TelemetrySample) -> Result<(), SinkError> {
        let payload = encode(sample, self.format)?;

        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        writer.write_all(&payload)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        Ok(())
    }
}

/// Forwards samples into an in-process channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TelemetrySample>,
}

impl ChannelSink {
    /// Create a sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TelemetrySample>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TelemetrySink for ChannelSink {
    fn publish(&self, sample: &TelemetrySample) -> Result<(), SinkError> {
        self.tx.send(sample.clone()).map_err(|_| SinkError::Closed)
    }
}
