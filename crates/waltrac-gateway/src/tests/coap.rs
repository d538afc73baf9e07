//! End-to-end CoAP requests against a loopback server.

use super::harness::{context, signed_position, RecordingBroker, SECRET};
use crate::{CoapServer, Router};
use coap_lite::{CoapRequest, MessageClass, Packet, RequestType, ResponseType};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::timeout;

async fn start_server(broker: &std::sync::Arc<RecordingBroker>) -> (SocketAddr, JoinHandle<()>) {
    let server = CoapServer::bind("127.0.0.1:0", Router::new(context(broker)))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let _ = server.run().await;
    });
    (addr, handle)
}

async fn request(server: SocketAddr, method: RequestType, path: &str, payload: Vec<u8>) -> Packet {
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let mut request: CoapRequest<SocketAddr> = CoapRequest::new();
    request.set_method(method);
    request.set_path(path);
    request.message.header.message_id = 42;
    request.message.set_token(vec![0xbe, 0xef]);
    request.message.payload = payload;

    client
        .send_to(&request.message.to_bytes().unwrap(), server)
        .await
        .unwrap();

    let mut buf = [0u8; 1500];
    let (len, _) = timeout(Duration::from_secs(5), client.recv_from(&mut buf))
        .await
        .expect("no response")
        .unwrap();
    Packet::from_bytes(&buf[..len]).unwrap()
}

fn status(packet: &Packet) -> MessageClass {
    packet.header.code
}

#[tokio::test]
async fn get_command_returns_signed_diagnostic() {
    let broker = RecordingBroker::new();
    let (addr, handle) = start_server(&broker).await;

    let response = request(addr, RequestType::Get, "command", vec![]).await;

    assert_eq!(status(&response), MessageClass::Response(ResponseType::Content));
    assert_eq!(response.header.message_id, 42);
    assert_eq!(response.get_token(), &[0xbe, 0xef]);
    assert_eq!(
        hex::encode(&response.payload),
        "050654452d535434dccc5bd8b03e7f088780dfc1102875b4"
    );

    handle.abort();
}

#[tokio::test]
async fn post_position_is_changed() {
    let broker = RecordingBroker::new();
    let (addr, handle) = start_server(&broker).await;

    let response = request(addr, RequestType::Post, "position", signed_position(Some(SECRET))).await;

    assert_eq!(status(&response), MessageClass::Response(ResponseType::Changed));
    assert_eq!(response.payload, vec![0x00]);
    assert_eq!(broker.delivered().len(), 1);

    handle.abort();
}

#[tokio::test]
async fn rejected_positions_map_to_client_errors() {
    let broker = RecordingBroker::new();
    let (addr, handle) = start_server(&broker).await;

    let garbage = request(addr, RequestType::Post, "position", vec![1, 2, 3]).await;
    assert_eq!(status(&garbage), MessageClass::Response(ResponseType::BadRequest));
    assert_eq!(garbage.payload, vec![0x00]);

    let forged = request(addr, RequestType::Post, "position", signed_position(Some(b"nope"))).await;
    assert_eq!(status(&forged), MessageClass::Response(ResponseType::Unauthorized));

    assert!(broker.delivered().is_empty());
    handle.abort();
}

#[tokio::test]
async fn unknown_routes() {
    let broker = RecordingBroker::new();
    let (addr, handle) = start_server(&broker).await;

    let missing = request(addr, RequestType::Get, "nowhere", vec![]).await;
    assert_eq!(status(&missing), MessageClass::Response(ResponseType::NotFound));

    let wrong_method = request(addr, RequestType::Post, "command", vec![]).await;
    assert_eq!(
        status(&wrong_method),
        MessageClass::Response(ResponseType::MethodNotAllowed)
    );

    let get_position = request(addr, RequestType::Get, "position", vec![]).await;
    assert_eq!(
        status(&get_position),
        MessageClass::Response(ResponseType::MethodNotAllowed)
    );

    handle.abort();
}

#[tokio::test]
async fn malformed_datagram_is_ignored() {
    let broker = RecordingBroker::new();
    let (addr, handle) = start_server(&broker).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(&[0xff], addr).await.unwrap();

    let mut buf = [0u8; 64];
    let reply = timeout(Duration::from_millis(300), client.recv_from(&mut buf)).await;
    assert!(reply.is_err());

    // Server still answers afterwards.
    let response = request(addr, RequestType::Get, "command", vec![]).await;
    assert_eq!(status(&response), MessageClass::Response(ResponseType::Content));

    handle.abort();
}
