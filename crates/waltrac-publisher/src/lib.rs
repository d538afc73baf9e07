//! Resilient broker publisher.
//!
//! A [`Publisher`] owns one long-lived broker connection inside a background
//! worker task. Callers never touch the connection: `publish` waits until the
//! worker reports the link as connected, then hands the message over. Any
//! send or keepalive failure drops the link and the worker reconnects after a
//! fixed delay.

mod broker;
mod error;
mod mqtt;
mod publisher;

#[cfg(test)]
mod tests;

pub use broker::{BrokerConnection, BrokerConnector};
pub use error::{PublishError, PublishResult};
pub use mqtt::{MqttConnection, MqttConnector, DEFAULT_CONNECT_TIMEOUT, DEFAULT_KEEP_ALIVE};
pub use publisher::{LinkState, Publisher, PublisherConfig, STOP_GRACE};
