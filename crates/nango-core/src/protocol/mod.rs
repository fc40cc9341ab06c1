//! Serial Protocol Communication
//!
//! Implements the nango text RPC protocol: NUL-terminated request fields,
//! one newline-terminated reply line per call.

pub mod async_client;
mod client;
pub mod codec;
mod connection;
mod device;
mod error;
pub mod serial;

pub use async_client::AsyncClient;
pub use client::Client;
pub use codec::{Arg, Param};
pub use connection::{Connection, ConnectionConfig, ConnectionState};
pub use device::{Device, SerialDevice};
pub use error::ProtocolError;
pub use serial::{open_port, SerialSettings};

/// Default baud rate for firmware communication
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default time to wait for a reply line in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 2000;

/// Default pause after opening the port in milliseconds
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 0;

/// Longest single blocking device read while waiting for a line
pub const READ_POLL_INTERVAL_MS: u64 = 10;
