//! Call dispatcher
//!
//! The protocol has no call identifiers, so a reply can only be matched to its
//! request by ordering. Every call therefore holds the connection lock from
//! its first written byte until its reply line has been read.

use serde_json::Value as JsonValue;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use super::{
    codec::{count_field, decode_reply, encode_value, flatten, params_from_json, Arg, Param},
    device::Device,
    Connection, ConnectionConfig, ConnectionState, ProtocolError,
};

/// Shared handle that issues calls over one connection.
///
/// Clones share the connection and its lock.
#[derive(Clone)]
pub struct Client {
    conn: Arc<Mutex<Connection>>,
}

impl Client {
    /// Wrap a connection (open or not)
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Client for a not yet opened serial connection
    pub fn with_config(config: ConnectionConfig) -> Self {
        Self::new(Connection::new(config))
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A caller that panicked mid-call leaves a suspect stream, not a broken lock
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the configured serial port
    pub fn open(&self) -> Result<(), ProtocolError> {
        self.lock().open()
    }

    /// Open over a caller-supplied device
    pub fn open_with(&self, device: Box<dyn Device>) -> Result<(), ProtocolError> {
        self.lock().open_with(device)
    }

    /// Release the device; every clone sees the connection closed
    pub fn close(&self) -> Result<(), ProtocolError> {
        self.lock().close()
    }

    /// Close and reopen the same way the connection was opened, clearing a suspect state
    pub fn reopen(&self) -> Result<(), ProtocolError> {
        self.lock().reopen()
    }

    /// Close and reopen over a fresh device
    pub fn reopen_with(&self, device: Box<dyn Device>) -> Result<(), ProtocolError> {
        self.lock().reopen_with(device)
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.lock().state()
    }

    /// Run `f` with exclusive access to the connection
    pub fn with_connection<R>(&self, f: impl FnOnce(&mut Connection) -> R) -> R {
        f(&mut self.lock())
    }

    /// Invoke `namespace`/`id` with `params` and return the reply line.
    ///
    /// Lists in `params` are spliced in place and nulls dropped before
    /// encoding. If any step fails the connection is marked
    /// [`ConnectionState::Suspect`]; bytes already flushed are not retracted.
    pub fn call(&self, namespace: &str, id: i64, params: &[Param]) -> Result<String, ProtocolError> {
        let mut conn = self.lock();
        let result = transact(&mut conn, namespace, id, params);

        if let Err(e) = &result {
            if conn.is_open() {
                warn!(
                    port = %conn.port_name(),
                    namespace,
                    id,
                    "call failed, connection is suspect until reopened: {}",
                    e
                );
                conn.discard_pending();
                conn.mark_suspect();
            }
        }
        result
    }

    /// Like [`call`](Self::call), for untyped arguments.
    ///
    /// Arguments are converted before anything is written, so an unsupported
    /// value fails the call with nothing sent. The connection is still marked
    /// [`ConnectionState::Suspect`], as for any failed call.
    pub fn call_json(
        &self,
        namespace: &str,
        id: i64,
        args: &[JsonValue],
    ) -> Result<String, ProtocolError> {
        match params_from_json(args) {
            Ok(params) => self.call(namespace, id, &params),
            Err(e) => {
                let mut conn = self.lock();
                if conn.is_open() {
                    warn!(
                        port = %conn.port_name(),
                        namespace,
                        id,
                        "argument encoding failed, connection is suspect until reopened: {}",
                        e
                    );
                    conn.mark_suspect();
                }
                Err(e)
            }
        }
    }
}

impl From<Connection> for Client {
    fn from(conn: Connection) -> Self {
        Self::new(conn)
    }
}

fn write_field(conn: &mut Connection, arg: &Arg) -> Result<(), ProtocolError> {
    conn.write(&encode_value(arg))
}

fn transact(
    conn: &mut Connection,
    namespace: &str,
    id: i64,
    params: &[Param],
) -> Result<String, ProtocolError> {
    write_field(conn, &Arg::from(namespace))?;
    write_field(conn, &Arg::Int(id))?;

    let args = flatten(params);
    write_field(conn, &count_field(args.len()))?;
    for arg in &args {
        write_field(conn, arg)?;
    }
    conn.flush()?;

    let reply = decode_reply(&conn.read_line()?);
    debug!(namespace, id, args = args.len(), reply = %reply, "call complete");
    Ok(reply)
}
