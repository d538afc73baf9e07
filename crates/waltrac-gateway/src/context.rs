//! Per-process state handed to request handlers.

use std::sync::Arc;
use std::time::Duration;
use waltrac_publisher::{BrokerConnector, Publisher};

/// Shared secret and publisher used by the resources.
pub struct GatewayContext<C: BrokerConnector> {
    secret: Vec<u8>,
    publisher: Arc<Publisher<C>>,
    publish_wait: Duration,
}

impl<C: BrokerConnector> GatewayContext<C> {
    pub fn new(secret: impl Into<Vec<u8>>, publisher: Arc<Publisher<C>>, publish_wait: Duration) -> Self {
        Self {
            secret: secret.into(),
            publisher,
            publish_wait,
        }
    }

    /// Key used to verify inbound and sign outbound messages.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn publisher(&self) -> &Arc<Publisher<C>> {
        &self.publisher
    }

    /// How long a position request waits on its publish before answering.
    pub fn publish_wait(&self) -> Duration {
        self.publish_wait
    }
}
