//! The firmware's Wire (I2C) library (namespace `Wire`)

use std::fmt;

use super::RemoteObject;
use crate::params;
use crate::protocol::{Client, Param, ProtocolError};

const NAMESPACE: &str = "Wire";

/// 7-bit I2C device address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct I2cAddress(pub u8);

impl From<I2cAddress> for Param {
    fn from(addr: I2cAddress) -> Self {
        Param::from(addr.0)
    }
}

impl fmt::Display for I2cAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Wire library calls, one firmware round trip each
#[derive(Clone)]
pub struct Wire {
    object: RemoteObject,
}

impl Wire {
    /// Facade over the firmware's `Wire` object
    pub fn new(client: Client) -> Self {
        Self {
            object: RemoteObject::new(client, NAMESPACE, 0),
        }
    }

    /// Join the bus; `None` joins as master
    pub fn begin(&self, address: Option<I2cAddress>) -> Result<(), ProtocolError> {
        self.object.call_unit("begin", params![address])
    }

    /// Request `quantity` bytes from a slave; returns how many it sent
    pub fn request_from(
        &self,
        address: I2cAddress,
        quantity: usize,
        stop: bool,
    ) -> Result<usize, ProtocolError> {
        let quantity = i64::try_from(quantity).unwrap_or(i64::MAX);
        let received = self
            .object
            .call_int("requestFrom", params![address, quantity, stop])?;
        Ok(received.max(0) as usize)
    }

    /// Start queueing bytes for `address`
    pub fn begin_transmission(&self, address: I2cAddress) -> Result<(), ProtocolError> {
        self.object.call_unit("beginTransmission", params![address])
    }

    /// Finish a transmission and return the firmware's status code (0 = success)
    pub fn end_transmission(&self, stop: bool) -> Result<i64, ProtocolError> {
        self.object.call_int("endTransmission", params![stop])
    }

    /// Queue bytes, one call per byte. Returns how many were queued.
    pub fn write(&self, data: &[u8]) -> Result<usize, ProtocolError> {
        for &byte in data {
            self.object.call_unit("write", params![byte])?;
        }
        Ok(data.len())
    }

    /// Bytes waiting to be read
    pub fn available(&self) -> Result<usize, ProtocolError> {
        let n = self.object.call_int("available", params![])?;
        Ok(n.max(0) as usize)
    }

    /// Fill `buf`, one call per byte
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        for slot in buf.iter_mut() {
            *slot = self.object.call_byte("read", params![])?;
        }
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_display() {
        assert_eq!(I2cAddress(0x3C).to_string(), "0x3c");
        assert_eq!(Param::from(I2cAddress(104)), Param::from(104));
    }

    #[test]
    fn test_master_address_is_null() {
        assert_eq!(Param::from(None::<I2cAddress>), Param::Null);
    }
}
