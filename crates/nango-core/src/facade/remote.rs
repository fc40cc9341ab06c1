//! Typed calls on a remote firmware object

use tracing::warn;

use crate::protocol::{Client, Param, ProtocolError};

/// A firmware object addressed by namespace and id.
///
/// The first argument of every call is the method name.
#[derive(Clone)]
pub struct RemoteObject {
    client: Client,
    namespace: String,
    id: i64,
}

fn parse_reply<T: std::str::FromStr>(
    reply: String,
    expected: &'static str,
) -> Result<T, ProtocolError> {
    reply
        .parse()
        .map_err(|_| ProtocolError::Parse { expected, reply })
}

impl RemoteObject {
    /// Object `id` in `namespace`, reached through `client`
    pub fn new(client: Client, namespace: impl Into<String>, id: i64) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            id,
        }
    }

    /// Namespace the object lives in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Object id within the namespace
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Client the calls go through
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Call `method` and return the raw reply line
    pub fn method_call(&self, method: &str, args: Vec<Param>) -> Result<String, ProtocolError> {
        let mut params = Vec::with_capacity(args.len() + 1);
        params.push(Param::from(method));
        params.extend(args);
        self.client.call(&self.namespace, self.id, &params)
    }

    /// Reply line as text
    pub fn call_string(&self, method: &str, args: Vec<Param>) -> Result<String, ProtocolError> {
        self.method_call(method, args)
    }

    /// Reply parsed as a decimal integer
    pub fn call_int(&self, method: &str, args: Vec<Param>) -> Result<i64, ProtocolError> {
        parse_reply(self.method_call(method, args)?, "integer")
    }

    /// Reply parsed as a float
    pub fn call_float(&self, method: &str, args: Vec<Param>) -> Result<f64, ProtocolError> {
        parse_reply(self.method_call(method, args)?, "float")
    }

    /// First byte of the reply
    pub fn call_byte(&self, method: &str, args: Vec<Param>) -> Result<u8, ProtocolError> {
        let reply = self.method_call(method, args)?;
        if reply.len() > 1 {
            warn!(method, reply = %reply, "expected a single byte reply");
        }
        match reply.as_bytes().first() {
            Some(&byte) => Ok(byte),
            None => Err(ProtocolError::Parse {
                expected: "byte",
                reply,
            }),
        }
    }

    /// Call for effect; the reply is discarded
    pub fn call_unit(&self, method: &str, args: Vec<Param>) -> Result<(), ProtocolError> {
        self.method_call(method, args).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::ScriptedDevice;
    use crate::params;
    use crate::protocol::ConnectionConfig;

    fn object(reply: &str) -> RemoteObject {
        let (device, _probe) = ScriptedDevice::replying(reply);
        let client = Client::with_config(ConnectionConfig::new("test0", 115200));
        client.open_with(Box::new(device)).unwrap();
        RemoteObject::new(client, "A", 0)
    }

    #[test]
    fn test_typed_replies() {
        assert_eq!(object("42").call_int("m", params![]).unwrap(), 42);
        assert_eq!(object("-3").call_int("m", params![]).unwrap(), -3);
        assert_eq!(object("2.5").call_float("m", params![]).unwrap(), 2.5);
        assert_eq!(object("hello").call_string("m", params![]).unwrap(), "hello");
        assert_eq!(object("True").call_string("m", params![]).unwrap(), "True");
        assert_eq!(object("A").call_byte("m", params![]).unwrap(), b'A');
        assert!(object("ok").call_unit("m", params![]).is_ok());
    }

    #[test]
    fn test_malformed_replies() {
        match object("4x").call_int("m", params![]) {
            Err(ProtocolError::Parse { expected, reply }) => {
                assert_eq!(expected, "integer");
                assert_eq!(reply, "4x");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(matches!(
            object("nan?").call_float("m", params![]),
            Err(ProtocolError::Parse { .. })
        ));
        assert!(matches!(
            object("").call_byte("m", params![]),
            Err(ProtocolError::Parse { expected: "byte", .. })
        ));
    }

    #[test]
    fn test_long_byte_reply_keeps_first_byte() {
        assert_eq!(object("xyz").call_byte("read", params![]).unwrap(), b'x');
    }
}
