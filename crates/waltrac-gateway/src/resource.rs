//! Request handlers for device-facing resources.
//!
//! Handlers are transport-agnostic: they take the raw request payload and
//! return an [`Outcome`], which the transport adapter maps to its own status
//! codes.

use crate::{GatewayContext, PositionEvent};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use waltrac_codec::{sign, verify, Command, Position};
use waltrac_publisher::BrokerConnector;

/// Header byte of the diagnostic command.
pub const DIAGNOSTIC_HEADER: u8 = 0x05;

/// Argument of the diagnostic command.
pub const DIAGNOSTIC_ARG: &str = "TE-ST4";

/// Result of handling one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Message accepted for republishing.
    Accepted,
    /// Response body for a read request.
    Content(Vec<u8>),
    /// Payload could not be decoded.
    BadRequest,
    /// Payload decoded but failed authentication.
    Unauthorized,
    /// A downstream step failed.
    ServerError,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Accepted | Outcome::Content(_))
    }
}

/// Ingests signed position reports.
pub struct PositionResource<C: BrokerConnector> {
    context: Arc<GatewayContext<C>>,
    /// One permit per publish task still running, sized to the publisher's queue.
    in_flight: Arc<Semaphore>,
}

impl<C: BrokerConnector> PositionResource<C> {
    pub fn new(context: Arc<GatewayContext<C>>) -> Self {
        let limit = context.publisher().config().queue_capacity.max(1);
        Self {
            context,
            in_flight: Arc::new(Semaphore::new(limit)),
        }
    }

    /// Decode, verify and republish one position report.
    ///
    /// The publish runs on its own task. If it has not completed within the
    /// context's publish window the request is accepted anyway and the
    /// publish carries on in the background. Once as many publishes are
    /// outstanding as the publisher queues, further reports are refused.
    pub async fn handle(&self, payload: &[u8]) -> Outcome {
        debug!(payload = %hex::encode(payload), "Received position");

        let position = match Position::decode(payload) {
            Ok(position) => position,
            Err(e) => {
                warn!(error = %e, len = payload.len(), "Received invalid payload, discarding message");
                return Outcome::BadRequest;
            }
        };

        if !verify(&position, self.context.secret()) {
            error!(device = %position.device, "Received message with invalid signature, discarding message");
            return Outcome::Unauthorized;
        }

        info!(device = %position.device, "Processing: {}", position);

        let event = PositionEvent::from_position(&position, Utc::now());
        let body = match event.to_json() {
            Ok(body) => body,
            Err(e) => {
                error!(device = %event.device, error = %e, "Failed to serialize position event");
                return Outcome::ServerError;
            }
        };

        let Ok(permit) = self.in_flight.clone().try_acquire_owned() else {
            warn!(device = %event.device, "Too many positions awaiting the broker, discarding message");
            return Outcome::ServerError;
        };

        let subtopic = event.subtopic();
        let publisher = self.context.publisher().clone();
        let mut publish = tokio::spawn(async move {
            let _permit = permit;
            let result = publisher.publish(&subtopic, body).await;
            if let Err(e) = &result {
                error!(subtopic = %subtopic, error = %e, "Failed to publish position");
            }
            result
        });

        match timeout(self.context.publish_wait(), &mut publish).await {
            Ok(Ok(Ok(()))) => Outcome::Accepted,
            Ok(Ok(Err(_))) => Outcome::ServerError,
            Ok(Err(e)) => {
                error!(error = %e, "Publish task failed");
                Outcome::ServerError
            }
            Err(_) => {
                debug!(device = %event.device, "Publish still pending, accepting message");
                Outcome::Accepted
            }
        }
    }
}

/// Answers read requests with a signed diagnostic command.
pub struct CommandResource {
    secret: Vec<u8>,
}

impl CommandResource {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn from_context<C: BrokerConnector>(context: &GatewayContext<C>) -> Self {
        Self::new(context.secret())
    }

    /// The diagnostic command, unsigned.
    pub fn diagnostic() -> Command {
        Command {
            header: DIAGNOSTIC_HEADER,
            arg: DIAGNOSTIC_ARG.to_string(),
            ..Default::default()
        }
    }

    pub fn handle(&self) -> Outcome {
        let mut command = Self::diagnostic();
        match sign(&mut command, Some(self.secret.as_slice())) {
            Ok(bytes) => {
                debug!(%command, "Serving diagnostic command");
                Outcome::Content(bytes)
            }
            Err(e) => {
                error!(error = %e, "Failed to sign diagnostic command");
                Outcome::ServerError
            }
        }
    }
}
