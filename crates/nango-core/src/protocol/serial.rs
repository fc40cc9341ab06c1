//! Serial port handling
//!
//! Line settings for the firmware link and low-level port opening.

use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use std::time::Duration;

use super::{ProtocolError, DEFAULT_BAUD_RATE, READ_POLL_INTERVAL_MS};

/// Parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    /// No parity bit
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Flow control setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    /// No flow control
    None,
    /// XON/XOFF
    Software,
    /// RTS/CTS
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Serial line configuration, passed through to the serial driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Port name (e.g., "/dev/ttyACM0" or "COM3")
    pub port_name: String,

    /// Baud rate
    pub baud_rate: u32,

    /// Data bits per character (5-8)
    pub data_bits: u8,

    /// Parity
    pub parity: Parity,

    /// Stop bits (1 or 2)
    pub stop_bits: u8,

    /// Flow control
    pub flow_control: FlowControl,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            flow_control: FlowControl::None,
        }
    }
}

impl SerialSettings {
    /// Settings for the given port with 8N1 defaults
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Self::default()
        }
    }

    fn data_bits(&self) -> Result<serialport::DataBits, ProtocolError> {
        match self.data_bits {
            5 => Ok(serialport::DataBits::Five),
            6 => Ok(serialport::DataBits::Six),
            7 => Ok(serialport::DataBits::Seven),
            8 => Ok(serialport::DataBits::Eight),
            other => Err(ProtocolError::Config(format!(
                "unsupported data bits: {}",
                other
            ))),
        }
    }

    fn stop_bits(&self) -> Result<serialport::StopBits, ProtocolError> {
        match self.stop_bits {
            1 => Ok(serialport::StopBits::One),
            2 => Ok(serialport::StopBits::Two),
            other => Err(ProtocolError::Config(format!(
                "unsupported stop bits: {}",
                other
            ))),
        }
    }
}

/// Open a serial port with the given line settings.
///
/// Driver failures come back untouched as [`ProtocolError::Serial`].
pub fn open_port(settings: &SerialSettings) -> Result<Box<dyn SerialPort>, ProtocolError> {
    // Short driver timeout; line reads enforce their own deadline on top
    let port = serialport::new(settings.port_name.as_str(), settings.baud_rate)
        .data_bits(settings.data_bits()?)
        .parity(settings.parity.into())
        .stop_bits(settings.stop_bits()?)
        .flow_control(settings.flow_control.into())
        .timeout(Duration::from_millis(READ_POLL_INTERVAL_MS))
        .open()?;
    Ok(port)
}
