//! # Nango Core Library
//!
//! Host-side client for the nango serial RPC firmware.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Serial transport with buffered writes and deadline-bounded line reads
//! - The request encoding (NUL-terminated text fields) and reply decoding
//! - A call dispatcher that keeps concurrent calls from interleaving
//! - Typed facades: pin access, the Wire library, I2C master/slave
//! - A simulated board for running without hardware
//!
//! ## Example
//!
//! ```rust,ignore
//! use nango_core::prelude::*;
//!
//! let client = Client::with_config(ConnectionConfig::new("/dev/ttyACM0", 115200));
//! client.open()?;
//!
//! let arduino = ArduinoApi::new(client.clone());
//! arduino.pin_mode("13", PinMode::Output)?;
//! arduino.digital_write("13", PinLevel::High)?;
//! println!("uptime: {}ms", arduino.millis()?);
//! ```

pub mod demo;
pub mod facade;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::facade::{
        ArduinoApi, BitOrder, I2cAddress, I2cMaster, I2cSlave, I2cStatus, PinLevel, PinMode,
        RemoteObject, Wire,
    };
    pub use crate::params;
    pub use crate::protocol::{
        Arg, AsyncClient, Client, Connection, ConnectionConfig, ConnectionState, Param,
        ProtocolError,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
