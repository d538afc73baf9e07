//! Reconnecting publisher and its background worker.
//!
//! Link lifecycle, driven only by the worker task:
//!
//! ```text
//! Disconnected -> Connecting -> Connected
//!      ^              |             |
//!      +-- backoff <--+  failure <--+
//!
//! any state -- stop() --> Stopped
//! ```
//!
//! The worker is the single writer of [`LinkState`] and the sole owner of the
//! broker connection. Callers observe the state through a `watch` channel and
//! hand messages to the worker over an `mpsc` queue.
//!
//! A send is bounded by the keepalive interval. A worker that has not wound
//! down within [`STOP_GRACE`] of `stop()` is aborted.

use crate::{BrokerConnection, BrokerConnector, PublishError, PublishResult};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, timeout, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use waltrac_config_and_utils::{
    GatewayConfig, DEFAULT_KEEPALIVE_INTERVAL_SECS, DEFAULT_RECONNECT_DELAY_SECS, DEFAULT_TOPLEVEL,
};

/// Default capacity of the worker's request queue.
const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// How long `stop()` waits for the worker before aborting it.
pub const STOP_GRACE: Duration = Duration::from_secs(5);

/// Publisher configuration.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Namespace prefixed to every topic.
    pub toplevel: String,
    /// Pause between connection attempts.
    pub reconnect_delay: Duration,
    /// Interval between liveness probes while connected. Also bounds a
    /// single send.
    pub keepalive_interval: Duration,
    /// Publish requests that may queue up for the worker.
    pub queue_capacity: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            toplevel: DEFAULT_TOPLEVEL.to_string(),
            reconnect_delay: Duration::from_secs(DEFAULT_RECONNECT_DELAY_SECS),
            keepalive_interval: Duration::from_secs(DEFAULT_KEEPALIVE_INTERVAL_SECS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl PublisherConfig {
    pub fn new(toplevel: impl Into<String>) -> Self {
        Self {
            toplevel: toplevel.into(),
            ..Default::default()
        }
    }

    /// Timer settings from the gateway config, with the given namespace.
    pub fn from_gateway(config: &GatewayConfig, toplevel: impl Into<String>) -> Self {
        Self {
            toplevel: toplevel.into(),
            reconnect_delay: config.reconnect_delay(),
            keepalive_interval: config.keepalive_interval(),
            ..Default::default()
        }
    }

    /// Fully qualified topic: `<toplevel>/<subtopic>`.
    pub fn topic(&self, subtopic: &str) -> String {
        format!("{}/{}", self.toplevel, subtopic)
    }
}

/// State of the broker link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Stopped,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

struct PublishRequest {
    subtopic: String,
    payload: Vec<u8>,
    reply: oneshot::Sender<PublishResult<()>>,
}

/// Why the worker left a connected session.
enum SessionEnd {
    Lost,
    Shutdown,
}

/// Background task state. Built in [`Publisher::new`], moved into the task
/// by [`Publisher::start`].
struct Worker<C: BrokerConnector> {
    connector: C,
    config: PublisherConfig,
    state: watch::Sender<LinkState>,
    requests: mpsc::Receiver<PublishRequest>,
    shutdown: oneshot::Receiver<()>,
}

/// Resilient publisher over a single broker connection.
pub struct Publisher<C: BrokerConnector> {
    config: PublisherConfig,
    state: watch::Receiver<LinkState>,
    requests: mpsc::Sender<PublishRequest>,
    worker: Mutex<Option<Worker<C>>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl<C: BrokerConnector> Publisher<C> {
    /// Create a publisher. Nothing connects until [`Publisher::start`].
    pub fn new(connector: C, config: PublisherConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(LinkState::Disconnected);
        let (request_tx, request_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = Worker {
            connector,
            config: config.clone(),
            state: state_tx,
            requests: request_rx,
            shutdown: shutdown_rx,
        };

        Self {
            config,
            state: state_rx,
            requests: request_tx,
            worker: Mutex::new(Some(worker)),
            shutdown: Mutex::new(Some(shutdown_tx)),
            handle: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Spawn the background connect loop. Later calls do nothing.
    pub fn start(&self) {
        let Some(worker) = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            debug!("Publisher already started");
            return;
        };

        info!(toplevel = %self.config.toplevel, "Starting publisher");
        let handle = tokio::spawn(worker.run());
        *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Stop the worker, close the connection and fail any later publish.
    ///
    /// Returns within [`STOP_GRACE`] even if the broker stops responding.
    pub async fn stop(&self) {
        let pending = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(worker) = pending {
            // Never started: nothing to tear down.
            worker.state.send_replace(LinkState::Stopped);
            self.stopped.store(true, Ordering::SeqCst);
            return;
        }

        let shutdown = self.shutdown.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(());
        }

        let handle = self.handle.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(mut handle) = handle {
            match timeout(STOP_GRACE, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Publisher worker ended abnormally"),
                Err(_) => {
                    warn!(
                        grace_secs = STOP_GRACE.as_secs_f64(),
                        "Publisher worker did not stop in time, aborting"
                    );
                    handle.abort();
                }
            }
        }

        // An aborted worker never writes Stopped itself.
        self.stopped.store(true, Ordering::SeqCst);
        info!("Publisher stopped");
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        if self.stopped.load(Ordering::SeqCst) {
            return LinkState::Stopped;
        }
        *self.state.borrow()
    }

    /// True while a broker connection is established.
    pub fn is_ready(&self) -> bool {
        self.state() == LinkState::Connected
    }

    /// Subscribe to link state changes.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    /// Publish `payload` under `<toplevel>/<subtopic>`.
    ///
    /// Suspends until the link is connected. A send failure is returned to
    /// the caller and also drops the link, so the next call waits for the
    /// reconnect.
    pub async fn publish(&self, subtopic: &str, payload: Vec<u8>) -> PublishResult<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(PublishError::Stopped);
        }

        let mut state = self.state.clone();
        let stopped = *state
            .wait_for(|s| matches!(s, LinkState::Connected | LinkState::Stopped))
            .await
            .map_err(|_| PublishError::Stopped)?
            == LinkState::Stopped;
        if stopped {
            return Err(PublishError::Stopped);
        }

        let (reply, response) = oneshot::channel();
        let request = PublishRequest {
            subtopic: subtopic.to_string(),
            payload,
            reply,
        };

        self.requests
            .send(request)
            .await
            .map_err(|_| PublishError::Stopped)?;

        response.await.map_err(|_| PublishError::Stopped)?
    }
}

impl<C: BrokerConnector> Worker<C> {
    async fn run(mut self) {
        loop {
            self.state.send_replace(LinkState::Connecting);

            let attempt = tokio::select! {
                _ = &mut self.shutdown => break,
                result = self.connector.connect() => result,
            };

            match attempt {
                Ok(connection) => {
                    info!(toplevel = %self.config.toplevel, "Connected to broker");
                    self.state.send_replace(LinkState::Connected);

                    if let SessionEnd::Shutdown = self.serve(connection).await {
                        break;
                    }
                }
                Err(e) => {
                    self.state.send_replace(LinkState::Disconnected);
                    warn!(
                        error = %e,
                        retry_in_secs = self.config.reconnect_delay.as_secs_f64(),
                        "Broker connection failed, retrying"
                    );
                }
            }

            tokio::select! {
                _ = &mut self.shutdown => break,
                _ = sleep(self.config.reconnect_delay) => {}
            }
        }

        self.state.send_replace(LinkState::Stopped);

        // Anything still queued can no longer be delivered.
        self.requests.close();
        while let Ok(request) = self.requests.try_recv() {
            let _ = request.reply.send(Err(PublishError::Stopped));
        }
    }

    /// Drive one connected session until it fails or shutdown is requested.
    async fn serve(&mut self, mut connection: C::Connection) -> SessionEnd {
        let period = self.config.keepalive_interval.max(Duration::from_millis(1));
        let mut keepalive = interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut self.shutdown => {
                    connection.disconnect().await;
                    return SessionEnd::Shutdown;
                }
                request = self.requests.recv() => {
                    let Some(request) = request else {
                        connection.disconnect().await;
                        return SessionEnd::Shutdown;
                    };

                    let topic = self.config.topic(&request.subtopic);
                    let sent = tokio::select! {
                        _ = &mut self.shutdown => {
                            let _ = request.reply.send(Err(PublishError::Stopped));
                            connection.disconnect().await;
                            return SessionEnd::Shutdown;
                        }
                        result = timeout(period, connection.publish(&topic, request.payload)) => {
                            result.unwrap_or(Err(PublishError::Timeout(period)))
                        }
                    };

                    match sent {
                        Ok(()) => {
                            debug!(topic = %topic, "Published");
                            let _ = request.reply.send(Ok(()));
                        }
                        Err(e) => {
                            // Readiness is cleared before the caller hears about it.
                            self.state.send_replace(LinkState::Disconnected);
                            warn!(topic = %topic, error = %e, "Publish failed, dropping broker connection");
                            let _ = request.reply.send(Err(e));
                            return SessionEnd::Lost;
                        }
                    }
                }
                _ = keepalive.tick() => {
                    if let Err(e) = connection.keepalive().await {
                        self.state.send_replace(LinkState::Disconnected);
                        warn!(error = %e, "Broker keepalive failed, dropping broker connection");
                        return SessionEnd::Lost;
                    }
                }
            }
        }
    }
}
