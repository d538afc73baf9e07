//! Seam between the publisher and a concrete broker client.

use crate::PublishResult;
use async_trait::async_trait;

/// Opens broker sessions. Called again after every lost connection.
#[async_trait]
pub trait BrokerConnector: Send + Sync + 'static {
    type Connection: BrokerConnection;

    async fn connect(&self) -> PublishResult<Self::Connection>;
}

/// A live broker session.
///
/// Every method fails on I/O errors; after any failure the session is
/// discarded and never used again.
#[async_trait]
pub trait BrokerConnection: Send + 'static {
    /// Send `payload` to the fully qualified `topic`.
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> PublishResult<()>;

    /// Check that the session is still alive.
    async fn keepalive(&mut self) -> PublishResult<()>;

    /// Close the session. Best effort.
    async fn disconnect(&mut self);
}
