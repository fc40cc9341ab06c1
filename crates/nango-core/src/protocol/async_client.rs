//! Async adapter over [`Client`]
//!
//! Serial I/O is blocking, so each call runs on tokio's blocking pool. The
//! adapter shares the client's connection lock, so async and blocking callers
//! are ordered together.

use tokio::task::JoinError;

use super::{Client, Param, ProtocolError};

/// [`Client`] for async callers; calls run on the blocking pool
#[derive(Clone)]
pub struct AsyncClient {
    inner: Client,
}

fn join_error(e: JoinError) -> ProtocolError {
    ProtocolError::TaskJoin(e.to_string())
}

impl AsyncClient {
    /// Wrap a blocking client
    pub fn new(inner: Client) -> Self {
        Self { inner }
    }

    /// The blocking client underneath
    pub fn blocking(&self) -> &Client {
        &self.inner
    }

    /// See [`Client::open`]
    pub async fn open(&self) -> Result<(), ProtocolError> {
        let client = self.inner.clone();
        tokio::task::spawn_blocking(move || client.open())
            .await
            .map_err(join_error)?
    }

    /// See [`Client::close`]
    pub async fn close(&self) -> Result<(), ProtocolError> {
        let client = self.inner.clone();
        tokio::task::spawn_blocking(move || client.close())
            .await
            .map_err(join_error)?
    }

    /// See [`Client::call`]
    pub async fn call(
        &self,
        namespace: impl Into<String>,
        id: i64,
        params: Vec<Param>,
    ) -> Result<String, ProtocolError> {
        let client = self.inner.clone();
        let namespace = namespace.into();
        tokio::task::spawn_blocking(move || client.call(&namespace, id, &params))
            .await
            .map_err(join_error)?
    }
}

impl From<Client> for AsyncClient {
    fn from(inner: Client) -> Self {
        Self::new(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::ScriptedDevice;
    use crate::params;
    use crate::protocol::{ConnectionConfig, ConnectionState};

    #[tokio::test]
    async fn test_async_call_round_trip() {
        let (device, probe) = ScriptedDevice::replying("ok");
        let client = Client::with_config(ConnectionConfig::new("test0", 115200));
        client.open_with(Box::new(device)).unwrap();

        let client = AsyncClient::from(client);
        let reply = client.call("A", 0, params!["pm", "13", 1]).await.unwrap();
        assert_eq!(reply, "ok");
        assert_eq!(probe.written(), b"A\x000\x002\x00pm\x0013\x001\x00".to_vec());

        client.close().await.unwrap();
        assert_eq!(client.blocking().state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_async_call_on_closed_port() {
        let client = AsyncClient::new(Client::with_config(ConnectionConfig::default()));
        let err = client.call("A", 0, params!["m"]).await.unwrap_err();
        assert!(matches!(err, ProtocolError::PortClosed));
    }
}
