//! I2C master and slave roles on top of [`Wire`]

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use super::{I2cAddress, Wire};
use crate::protocol::ProtocolError;

/// Non-zero `endTransmission` status reported by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum I2cStatus {
    /// Data too long to fit in the transmit buffer
    DataTooLong,
    /// NACK while sending the address
    AddressNack,
    /// NACK while sending data
    DataNack,
    /// Any other non-zero status
    Other(i64),
}

impl I2cStatus {
    /// Status for a firmware code; `None` for 0 (success)
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => None,
            1 => Some(I2cStatus::DataTooLong),
            2 => Some(I2cStatus::AddressNack),
            3 => Some(I2cStatus::DataNack),
            other => Some(I2cStatus::Other(other)),
        }
    }

    /// Status code as the firmware reports it
    pub fn code(&self) -> i64 {
        match self {
            I2cStatus::DataTooLong => 1,
            I2cStatus::AddressNack => 2,
            I2cStatus::DataNack => 3,
            I2cStatus::Other(code) => *code,
        }
    }
}

impl fmt::Display for I2cStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            I2cStatus::DataTooLong => f.write_str("data too long to fit in transmit buffer"),
            I2cStatus::AddressNack => f.write_str("received NACK on transmit of address"),
            I2cStatus::DataNack => f.write_str("received NACK on transmit of data"),
            I2cStatus::Other(code) => write!(f, "other error (status {})", code),
        }
    }
}

/// Wire handle that joins the bus on first use
struct Bus {
    wire: Wire,
    address: Option<I2cAddress>,
    joined: AtomicBool,
}

impl Bus {
    fn new(wire: Wire, address: Option<I2cAddress>) -> Self {
        Self {
            wire,
            address,
            joined: AtomicBool::new(false),
        }
    }

    fn begin(&self) -> Result<&Wire, ProtocolError> {
        if !self.joined.load(Ordering::Acquire) {
            self.wire.begin(self.address)?;
            self.joined.store(true, Ordering::Release);
        }
        Ok(&self.wire)
    }
}

/// Bus master
pub struct I2cMaster {
    bus: Bus,
}

impl I2cMaster {
    /// Master on the bus behind `wire`; the bus is joined on first use
    pub fn new(wire: Wire) -> Self {
        Self {
            bus: Bus::new(wire, None),
        }
    }

    /// Read up to `quantity` bytes from a slave
    pub fn request(&self, address: I2cAddress, quantity: usize) -> Result<Vec<u8>, ProtocolError> {
        let wire = self.bus.begin()?;
        let received = wire.request_from(address, quantity, true)?;
        if received < quantity {
            warn!(%address, quantity, received, "slave sent fewer bytes than requested");
        }
        let mut buf = vec![0u8; received];
        wire.read(&mut buf)?;
        Ok(buf)
    }

    /// Write `data` to a slave. A non-zero bus status is a [`ProtocolError::Communication`].
    pub fn send(&self, address: I2cAddress, data: &[u8]) -> Result<(), ProtocolError> {
        let wire = self.bus.begin()?;
        wire.begin_transmission(address)?;
        wire.write(data)?;
        let code = wire.end_transmission(true)?;
        match I2cStatus::from_code(code) {
            None => Ok(()),
            Some(status) => Err(ProtocolError::Communication(status)),
        }
    }

    /// Addresses that acknowledge an empty write
    pub fn scan(&self) -> Result<Vec<I2cAddress>, ProtocolError> {
        let mut found = Vec::new();
        for raw in 1..=127u8 {
            let address = I2cAddress(raw);
            match self.send(address, &[]) {
                Ok(()) => found.push(address),
                // nobody home
                Err(ProtocolError::Communication(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }
}

/// Bus slave at a fixed address
pub struct I2cSlave {
    bus: Bus,
}

impl I2cSlave {
    /// Slave answering at `address`; the bus is joined on first use
    pub fn new(wire: Wire, address: I2cAddress) -> Self {
        Self {
            bus: Bus::new(wire, Some(address)),
        }
    }

    /// Address the slave joins the bus with
    pub fn address(&self) -> Option<I2cAddress> {
        self.bus.address
    }

    /// Bytes the master has sent
    pub fn receive(&self) -> Result<Vec<u8>, ProtocolError> {
        let wire = self.bus.begin()?;
        let mut buf = vec![0u8; wire.available()?];
        wire.read(&mut buf)?;
        Ok(buf)
    }

    /// Queue bytes for the master
    pub fn write(&self, data: &[u8]) -> Result<usize, ProtocolError> {
        self.bus.begin()?.write(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(I2cStatus::from_code(0), None);
        assert_eq!(I2cStatus::from_code(1), Some(I2cStatus::DataTooLong));
        assert_eq!(I2cStatus::from_code(2), Some(I2cStatus::AddressNack));
        assert_eq!(I2cStatus::from_code(3), Some(I2cStatus::DataNack));
        assert_eq!(I2cStatus::from_code(4), Some(I2cStatus::Other(4)));
        assert_eq!(I2cStatus::AddressNack.code(), 2);
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(
            I2cStatus::AddressNack.to_string(),
            "received NACK on transmit of address"
        );
        let err = ProtocolError::Communication(I2cStatus::DataNack);
        assert!(err.to_string().contains("NACK on transmit of data"));
    }
}
