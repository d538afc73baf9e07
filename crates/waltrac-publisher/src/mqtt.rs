//! MQTT broker adapter on top of `rumqttc`.
//!
//! `rumqttc` splits a session into an [`AsyncClient`] handle and an
//! [`EventLoop`] that must be polled for anything to reach the network. A
//! connection here polls the event loop until CONNACK, then hands it to a
//! driver task that keeps polling and records the first network error.

use crate::{BrokerConnection, BrokerConnector, PublishError, PublishResult};
use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, trace, warn};
use uuid::Uuid;
use waltrac_config_and_utils::{BrokerEndpoint, DEFAULT_KEEPALIVE_INTERVAL_SECS};

/// How long to wait for CONNACK before giving up on an attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// MQTT keepalive used unless [`MqttConnector::with_keep_alive`] overrides it.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(DEFAULT_KEEPALIVE_INTERVAL_SECS);

/// Smallest keepalive `rumqttc` accepts.
const MIN_KEEP_ALIVE: Duration = Duration::from_secs(1);

/// Capacity of the client's outbound request queue.
const CLIENT_QUEUE_CAPACITY: usize = 64;

/// How long `disconnect` lets the driver flush the DISCONNECT packet.
const DISCONNECT_GRACE: Duration = Duration::from_secs(1);

/// Opens MQTT sessions to a fixed broker endpoint.
#[derive(Debug, Clone)]
pub struct MqttConnector {
    endpoint: BrokerEndpoint,
    connect_timeout: Duration,
    keep_alive: Duration,
}

impl MqttConnector {
    pub fn new(endpoint: BrokerEndpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Interval at which the session pings the broker. Values under one
    /// second are raised to one second.
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive.max(MIN_KEEP_ALIVE);
        self
    }

    pub fn endpoint(&self) -> &BrokerEndpoint {
        &self.endpoint
    }

    fn options(&self, client_id: String) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, self.endpoint.host.clone(), self.endpoint.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        if let Some((username, password)) = self.endpoint.credentials() {
            options.set_credentials(username, password);
        }
        options
    }
}

/// Poll until the broker acknowledges the session.
async fn await_connack(eventloop: &mut EventLoop) -> PublishResult<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                return if ack.code == ConnectReturnCode::Success {
                    Ok(())
                } else {
                    Err(PublishError::Connect(format!("broker refused session: {:?}", ack.code)))
                };
            }
            Ok(event) => trace!(?event, "Event before CONNACK"),
            Err(e) => return Err(PublishError::Connect(e.to_string())),
        }
    }
}

#[async_trait]
impl BrokerConnector for MqttConnector {
    type Connection = MqttConnection;

    async fn connect(&self) -> PublishResult<MqttConnection> {
        let client_id = format!("waltrac-gateway-{}", Uuid::new_v4().simple());
        debug!(endpoint = %self.endpoint, client_id = %client_id, "Opening MQTT session");

        let (client, mut eventloop) = AsyncClient::new(self.options(client_id), CLIENT_QUEUE_CAPACITY);

        timeout(self.connect_timeout, await_connack(&mut eventloop))
            .await
            .map_err(|_| PublishError::Timeout(self.connect_timeout))??;

        let (failure_tx, failure_rx) = watch::channel(None);
        let driver = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::PingResp)) => trace!("MQTT ping response"),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "MQTT event loop failed");
                        let _ = failure_tx.send(Some(e.to_string()));
                        break;
                    }
                }
            }
        });

        Ok(MqttConnection {
            client,
            failure: failure_rx,
            driver,
        })
    }
}

/// An established MQTT session.
pub struct MqttConnection {
    client: AsyncClient,
    failure: watch::Receiver<Option<String>>,
    driver: JoinHandle<()>,
}

impl MqttConnection {
    /// First network error seen by the driver, if any.
    fn failure(&self) -> Option<String> {
        if let Some(reason) = self.failure.borrow().as_ref() {
            return Some(reason.clone());
        }
        if self.driver.is_finished() {
            return Some("event loop stopped".to_string());
        }
        None
    }
}

#[async_trait]
impl BrokerConnection for MqttConnection {
    async fn publish(&mut self, topic: &str, payload: Vec<u8>) -> PublishResult<()> {
        if let Some(reason) = self.failure() {
            return Err(PublishError::Send(reason));
        }

        self.client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| PublishError::Send(e.to_string()))
    }

    async fn keepalive(&mut self) -> PublishResult<()> {
        match self.failure() {
            Some(reason) => Err(PublishError::Keepalive(reason)),
            None => Ok(()),
        }
    }

    async fn disconnect(&mut self) {
        if self.client.disconnect().await.is_ok() {
            let _ = timeout(DISCONNECT_GRACE, &mut self.driver).await;
        }
        self.driver.abort();
    }
}

impl Drop for MqttConnection {
    fn drop(&mut self) {
        self.driver.abort();
    }
}
