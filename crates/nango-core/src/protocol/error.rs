//! Protocol errors

use thiserror::Error;

use crate::facade::I2cStatus;

/// Errors that can occur while talking to the firmware
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Operation on a connection that is not open
    #[error("Port is not open: call open() first")]
    PortClosed,

    /// Opening or configuring the serial port failed
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Device write, flush or clear failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Device failure while waiting for a reply
    #[error("Error reading line from port {port}: {source}")]
    Read {
        /// Port the read was on
        port: String,
        /// Underlying device error
        #[source]
        source: std::io::Error,
    },

    /// No reply line within the read timeout
    #[error("{port}: read_line timeout")]
    Timeout {
        /// Port that stayed silent
        port: String,
    },

    /// Argument value with no wire encoding
    #[error("Unsupported argument type: {0}")]
    UnsupportedType(String),

    /// Reply text is not the expected type
    #[error("Cannot parse reply {reply:?} as {expected}")]
    Parse {
        /// What the reply should have been
        expected: &'static str,
        /// Reply as received
        reply: String,
    },

    /// Non-zero I2C status returned by the firmware
    #[error("I2C communication error: {0}")]
    Communication(I2cStatus),

    /// Connection config could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Blocking task behind an async call panicked or was cancelled
    #[error("Blocking call task failed: {0}")]
    TaskJoin(String),
}

impl ProtocolError {
    /// True for a missing reply line
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProtocolError::Timeout { .. })
    }

    /// True when the failure happened on the device itself (open, write, flush or read)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ProtocolError::Serial(_) | ProtocolError::Io(_) | ProtocolError::Read { .. }
        )
    }
}
