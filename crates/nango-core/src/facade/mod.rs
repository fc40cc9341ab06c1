//! Typed wrappers over the call primitive
//!
//! Each facade holds a [`Client`](crate::protocol::Client) and calls it with a
//! fixed namespace and id, passing the method name as the first argument.

mod arduino;
mod i2c;
mod remote;
mod wire;

pub use arduino::{ArduinoApi, BitOrder, PinLevel, PinMode};
pub use i2c::{I2cMaster, I2cSlave, I2cStatus};
pub use remote::RemoteObject;
pub use wire::{I2cAddress, Wire};
