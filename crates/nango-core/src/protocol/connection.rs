//! Connection management
//!
//! Owns the device lifecycle and the buffered byte I/O underneath every call:
//! writes accumulate until an explicit flush, and replies are read one line at
//! a time under a deadline.

use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use super::{
    device::{Device, SerialDevice},
    serial::{open_port, SerialSettings},
    ProtocolError, DEFAULT_READ_TIMEOUT_MS, DEFAULT_SETTLE_DELAY_MS, READ_POLL_INTERVAL_MS,
};

/// Size of a single device read while scanning for a line
const READ_CHUNK_SIZE: usize = 256;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No device attached
    Closed,
    /// Open and in sync with the firmware
    Open,
    /// Open, but a call failed midway; the byte stream may be out of sync
    Suspect,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial line settings
    pub serial: SerialSettings,
    /// Pause after opening the port, for boards that reset on connect
    pub settle_delay_ms: u64,
    /// How long to wait for a reply line
    pub read_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl ConnectionConfig {
    /// Configuration for the given port and baud rate with default timing
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            serial: SerialSettings::new(port_name, baud_rate),
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON; omitted fields take defaults
    pub fn from_json_str(content: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(content)
            .map_err(|e| ProtocolError::Config(format!("invalid connection config: {}", e)))
    }

    /// Load a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProtocolError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// Settle delay as a duration
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Read timeout as a duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Buffered link to the firmware
pub struct Connection {
    /// Device handle, present while open
    device: Option<Box<dyn Device>>,
    /// Current connection state
    state: ConnectionState,
    /// Connection configuration
    config: ConnectionConfig,
    /// Bytes written but not yet flushed
    write_buf: Vec<u8>,
    /// Bytes received but not yet returned as a line
    read_buf: Vec<u8>,
    /// Device came from the caller rather than the configured port
    supplied: bool,
    /// Metrics: cumulative bytes sent & received
    tx_bytes: u64,
    rx_bytes: u64,
}

impl Connection {
    /// Create a new connection (not yet opened)
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            device: None,
            state: ConnectionState::Closed,
            config,
            write_buf: Vec::new(),
            read_buf: Vec::new(),
            supplied: false,
            tx_bytes: 0,
            rx_bytes: 0,
        }
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True while a device is attached (open or suspect)
    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Configuration the connection was created with
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Port name used in error messages and logs
    pub fn port_name(&self) -> &str {
        &self.config.serial.port_name
    }

    /// Get cumulative tx/rx byte counters
    pub fn get_counters(&self) -> (u64, u64) {
        (self.tx_bytes, self.rx_bytes)
    }

    /// Open the serial port named in the configuration
    pub fn open(&mut self) -> Result<(), ProtocolError> {
        if self.is_open() {
            return Ok(());
        }
        debug!(
            port = %self.port_name(),
            baud = self.config.serial.baud_rate,
            "opening serial port"
        );
        let port = open_port(&self.config.serial)?;
        self.attach(Box::new(SerialDevice::new(port)), false)
    }

    /// Open over an already constructed device.
    ///
    /// Waits the settle delay, then discards stale bytes in both directions.
    pub fn open_with(&mut self, device: Box<dyn Device>) -> Result<(), ProtocolError> {
        if self.is_open() {
            return Ok(());
        }
        self.attach(device, true)
    }

    /// Close and open again, returning a suspect connection to [`ConnectionState::Open`].
    ///
    /// A serial connection reopens the configured port. A connection over a
    /// supplied device is reset on that same device; if it is already closed
    /// there is nothing to reopen and the configured port is opened instead.
    pub fn reopen(&mut self) -> Result<(), ProtocolError> {
        if self.supplied {
            if let Some(device) = self.device.take() {
                self.close()?;
                return self.attach(device, true);
            }
        }
        self.close()?;
        self.open()
    }

    /// Close, then open over a fresh device
    pub fn reopen_with(&mut self, device: Box<dyn Device>) -> Result<(), ProtocolError> {
        self.close()?;
        self.attach(device, true)
    }

    fn attach(&mut self, mut device: Box<dyn Device>, supplied: bool) -> Result<(), ProtocolError> {
        let settle = self.config.settle_delay();
        if !settle.is_zero() {
            debug!(port = %self.port_name(), "waiting {}ms for firmware to settle", settle.as_millis());
            std::thread::sleep(settle);
        }

        device.clear_input_buffer()?;
        device.clear_output_buffer()?;

        self.write_buf.clear();
        self.read_buf.clear();
        self.device = Some(device);
        self.supplied = supplied;
        self.state = ConnectionState::Open;
        debug!(port = %self.port_name(), "port opened");
        Ok(())
    }

    /// Append bytes to the write buffer. Nothing reaches the device until [`flush`](Self::flush).
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), ProtocolError> {
        if self.device.is_none() {
            return Err(ProtocolError::PortClosed);
        }
        self.write_buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Push buffered bytes to the device
    pub fn flush(&mut self) -> Result<(), ProtocolError> {
        let device = self.device.as_mut().ok_or(ProtocolError::PortClosed)?;
        if !self.write_buf.is_empty() {
            device.write_all(&self.write_buf)?;
        }
        device.flush()?;

        let pending = std::mem::take(&mut self.write_buf);
        trace!(port = %self.config.serial.port_name, "flushed {} bytes: {:02x?}", pending.len(), pending);
        self.tx_bytes = self.tx_bytes.saturating_add(pending.len() as u64);
        Ok(())
    }

    /// Read one line, without its terminator.
    ///
    /// Blocks until `\n` arrives or the read timeout elapses. On timeout the
    /// device input is discarded so a late reply cannot be taken for the
    /// answer to the next request.
    pub fn read_line(&mut self) -> Result<Vec<u8>, ProtocolError> {
        if self.device.is_none() {
            return Err(ProtocolError::PortClosed);
        }

        let deadline = Instant::now() + self.config.read_timeout();
        let poll = Duration::from_millis(READ_POLL_INTERVAL_MS);
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out());
            }
            let wait = (deadline - now).min(poll);

            let device = self.device.as_mut().ok_or(ProtocolError::PortClosed)?;
            let result = match device.set_read_timeout(wait) {
                Ok(()) => device.read(&mut chunk),
                Err(e) => Err(e),
            };

            match result {
                Ok(0) => std::thread::sleep(wait.min(Duration::from_millis(1))),
                Ok(n) => {
                    self.read_buf.extend_from_slice(&chunk[..n]);
                    self.rx_bytes = self.rx_bytes.saturating_add(n as u64);
                }
                Err(ref e)
                    if matches!(
                        e.kind(),
                        ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) => {}
                Err(e) => {
                    self.discard_input();
                    return Err(ProtocolError::Read {
                        port: self.config.serial.port_name.clone(),
                        source: e,
                    });
                }
            }
        }
    }

    /// Discard pending device input
    pub fn flush_port(&mut self) -> Result<(), ProtocolError> {
        let device = self.device.as_mut().ok_or(ProtocolError::PortClosed)?;
        self.read_buf.clear();
        device.clear_input_buffer()?;
        Ok(())
    }

    /// Release the device. Closing a closed connection does nothing.
    pub fn close(&mut self) -> Result<(), ProtocolError> {
        if self.device.take().is_some() {
            debug!(port = %self.port_name(), "port closed");
        }
        self.write_buf.clear();
        self.read_buf.clear();
        self.state = ConnectionState::Closed;
        Ok(())
    }

    /// Flag the stream as out of sync after a failed call
    pub(crate) fn mark_suspect(&mut self) {
        if self.is_open() {
            self.state = ConnectionState::Suspect;
        }
    }

    /// Drop bytes of an aborted request that never left the host
    pub(crate) fn discard_pending(&mut self) {
        self.write_buf.clear();
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.clear_output_buffer() {
                warn!(port = %self.config.serial.port_name, "error discarding serial output: {}", e);
            }
        }
    }

    fn take_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.read_buf.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.read_buf.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    fn timed_out(&mut self) -> ProtocolError {
        let port = self.config.serial.port_name.clone();
        warn!(port = %port, "no reply within {}ms", self.config.read_timeout_ms);
        self.discard_input();
        ProtocolError::Timeout { port }
    }

    fn discard_input(&mut self) {
        self.read_buf.clear();
        if let Some(device) = self.device.as_mut() {
            if let Err(e) = device.clear_input_buffer() {
                warn!(port = %self.config.serial.port_name, "error flushing serial port: {}", e);
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
