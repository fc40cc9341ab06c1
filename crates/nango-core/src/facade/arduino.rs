//! Pin access on the firmware's Arduino core (namespace `A`)

use serde::{Deserialize, Serialize};

use super::RemoteObject;
use crate::params;
use crate::protocol::{Client, Param, ProtocolError};

const NAMESPACE: &str = "A";

/// Digital pin level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinLevel {
    /// 0 V
    Low = 0,
    /// Supply voltage
    High = 1,
}

impl From<PinLevel> for Param {
    fn from(level: PinLevel) -> Self {
        Param::from(level as i64)
    }
}

impl TryFrom<i64> for PinLevel {
    type Error = ProtocolError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PinLevel::Low),
            1 => Ok(PinLevel::High),
            other => Err(ProtocolError::Parse {
                expected: "pin level",
                reply: other.to_string(),
            }),
        }
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinMode {
    /// High-impedance input
    Input = 0,
    /// Driven output
    Output = 1,
    /// Input with the internal pull-up enabled
    InputPullup = 2,
}

impl From<PinMode> for Param {
    fn from(mode: PinMode) -> Self {
        Param::from(mode as i64)
    }
}

/// Bit order for `shift_out`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitOrder {
    /// Least significant bit first
    LsbFirst = 0,
    /// Most significant bit first
    MsbFirst = 1,
}

impl From<BitOrder> for Param {
    fn from(order: BitOrder) -> Self {
        Param::from(order as i64)
    }
}

/// Arduino core functions. Pins are named as the firmware names them ("13", "A0").
#[derive(Clone)]
pub struct ArduinoApi {
    object: RemoteObject,
}

impl ArduinoApi {
    /// Facade over the firmware's `A` object
    pub fn new(client: Client) -> Self {
        Self {
            object: RemoteObject::new(client, NAMESPACE, 0),
        }
    }

    /// Drive a pin high or low
    pub fn digital_write(&self, pin: &str, level: PinLevel) -> Result<(), ProtocolError> {
        self.object.call_unit("dw", params![pin, level])
    }

    /// Level currently on a pin
    pub fn digital_read(&self, pin: &str) -> Result<PinLevel, ProtocolError> {
        PinLevel::try_from(self.object.call_int("r", params![pin])?)
    }

    /// PWM output, 0-255
    pub fn analog_write(&self, pin: &str, value: i64) -> Result<(), ProtocolError> {
        self.object.call_unit("aw", params![pin, value])
    }

    /// ADC reading, 0-1023
    pub fn analog_read(&self, pin: &str) -> Result<i64, ProtocolError> {
        self.object.call_int("a", params![pin])
    }

    /// Set a pin's direction
    pub fn pin_mode(&self, pin: &str, mode: PinMode) -> Result<(), ProtocolError> {
        self.object.call_unit("pm", params![pin, mode])
    }

    /// Milliseconds since the board started
    pub fn millis(&self) -> Result<i64, ProtocolError> {
        self.object.call_int("m", params![])
    }

    /// Length in microseconds of a pulse at `level`
    pub fn pulse_in(&self, pin: &str, level: PinLevel) -> Result<i64, ProtocolError> {
        self.object.call_int("pi", params![pin, level])
    }

    /// Clock `value` out one bit at a time on `data_pin`
    pub fn shift_out(
        &self,
        data_pin: &str,
        clock_pin: &str,
        bit_order: BitOrder,
        value: u8,
    ) -> Result<i64, ProtocolError> {
        self.object
            .call_int("s", params![data_pin, clock_pin, bit_order, value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_conversion() {
        assert_eq!(PinLevel::try_from(0).unwrap(), PinLevel::Low);
        assert_eq!(PinLevel::try_from(1).unwrap(), PinLevel::High);
        assert!(PinLevel::try_from(7).is_err());
    }

    #[test]
    fn test_enum_params() {
        assert_eq!(Param::from(PinMode::InputPullup), Param::from(2));
        assert_eq!(Param::from(BitOrder::MsbFirst), Param::from(1));
        assert_eq!(Param::from(PinLevel::High), Param::from(1));
    }
}
