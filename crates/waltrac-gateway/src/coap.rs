//! Minimal CoAP-over-UDP adapter.
//!
//! Routes:
//!
//! | Method | Path        | Handler              |
//! |--------|-------------|----------------------|
//! | POST   | `/position` | [`PositionResource`] |
//! | GET    | `/command`  | [`CommandResource`]  |
//!
//! Every datagram is handled on its own task. Responses reuse the request's
//! message id and token; retransmission and deduplication are left to the
//! client.

use crate::{CommandResource, GatewayContext, GatewayError, GatewayResult, Outcome, PositionResource};
use coap_lite::{CoapRequest, Packet, RequestType, ResponseType};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{ToSocketAddrs, UdpSocket};
use tracing::{debug, info, warn};
use waltrac_publisher::BrokerConnector;

/// Largest datagram accepted.
pub const MAX_DATAGRAM_SIZE: usize = 1152;

/// Body of every response that carries no content.
const EMPTY_BODY: [u8; 1] = [0x00];

/// CoAP response code for a handler outcome.
pub fn response_type(outcome: &Outcome) -> ResponseType {
    match outcome {
        Outcome::Accepted => ResponseType::Changed,
        Outcome::Content(_) => ResponseType::Content,
        Outcome::BadRequest => ResponseType::BadRequest,
        Outcome::Unauthorized => ResponseType::Unauthorized,
        Outcome::ServerError => ResponseType::InternalServerError,
    }
}

/// Maps method and path to a resource.
pub struct Router<C: BrokerConnector> {
    position: PositionResource<C>,
    command: CommandResource,
}

impl<C: BrokerConnector> Router<C> {
    pub fn new(context: Arc<GatewayContext<C>>) -> Self {
        Self {
            command: CommandResource::from_context(&context),
            position: PositionResource::new(context),
        }
    }

    /// Response code and body for one request.
    pub async fn dispatch(&self, method: &RequestType, path: &str, payload: &[u8]) -> (ResponseType, Vec<u8>) {
        let outcome = match (path, method) {
            ("position", RequestType::Post) => self.position.handle(payload).await,
            ("command", RequestType::Get) => self.command.handle(),
            ("position", _) | ("command", _) => {
                debug!(path, ?method, "Method not allowed");
                return (ResponseType::MethodNotAllowed, EMPTY_BODY.to_vec());
            }
            _ => {
                debug!(path, "Unknown resource");
                return (ResponseType::NotFound, EMPTY_BODY.to_vec());
            }
        };

        let status = response_type(&outcome);
        let body = match outcome {
            Outcome::Content(body) => body,
            _ => EMPTY_BODY.to_vec(),
        };
        (status, body)
    }
}

/// UDP listener feeding a [`Router`].
pub struct CoapServer<C: BrokerConnector> {
    socket: Arc<UdpSocket>,
    router: Arc<Router<C>>,
}

impl<C: BrokerConnector> CoapServer<C> {
    pub async fn bind(addr: impl ToSocketAddrs, router: Router<C>) -> GatewayResult<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
            router: Arc::new(router),
        })
    }

    pub fn local_addr(&self) -> GatewayResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Serve until the socket fails. Cancel by dropping the future.
    pub async fn run(&self) -> GatewayResult<()> {
        info!(addr = %self.local_addr()?, "CoAP server listening");

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (len, peer) = self.socket.recv_from(&mut buf).await?;
            let datagram = buf[..len].to_vec();

            let socket = self.socket.clone();
            let router = self.router.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_datagram(&socket, &router, &datagram, peer).await {
                    warn!(peer = %peer, error = %e, "Failed to answer CoAP request");
                }
            });
        }
    }
}

async fn handle_datagram<C: BrokerConnector>(
    socket: &UdpSocket,
    router: &Router<C>,
    datagram: &[u8],
    peer: SocketAddr,
) -> GatewayResult<()> {
    let packet = match Packet::from_bytes(datagram) {
        Ok(packet) => packet,
        Err(e) => {
            debug!(peer = %peer, error = ?e, "Ignoring malformed CoAP datagram");
            return Ok(());
        }
    };

    let mut request = CoapRequest::from_packet(packet, peer);
    let path = request.get_path();
    let (status, body) = router
        .dispatch(request.get_method(), &path, &request.message.payload)
        .await;

    debug!(peer = %peer, path = %path, status = ?status, "Answering CoAP request");

    // ACK and RST messages get no response.
    let Some(response) = request.response.as_mut() else {
        return Ok(());
    };
    response.set_status(status);
    response.message.payload = body;

    let bytes = response
        .message
        .to_bytes()
        .map_err(|e| GatewayError::Coap(format!("{:?}", e)))?;
    socket.send_to(&bytes, peer).await?;
    Ok(())
}
