//! UDP send/receive and the serve loop.

use crate::error::TransportError;
use crate::handler::RequestHandler;
use bytes::{Bytes, BytesMut};
use coap_wire::Message;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

/// Largest datagram read from the socket
pub const MAX_PACKET_LEN: usize = 1500;

/// How long [`receive`] waits for a datagram
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// First pause after a failed socket read in [`serve`]
const RECV_BACKOFF_BASE: Duration = Duration::from_millis(10);

/// Longest pause between failed socket reads
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Encode and send a message.
///
/// With an address the datagram goes to that peer, otherwise the socket
/// must be connected.
pub async fn transmit(
    socket: &UdpSocket,
    addr: Option<SocketAddr>,
    msg: &mut Message,
) -> Result<(), TransportError> {
    let data = msg.encode()?;
    match addr {
        Some(addr) => socket.send_to(&data, addr).await?,
        None => socket.send(&data).await?,
    };
    Ok(())
}

/// Receive and decode one message, waiting at most [`RESPONSE_TIMEOUT`]
pub async fn receive(socket: &UdpSocket) -> Result<(Message, SocketAddr), TransportError> {
    receive_timeout(socket, RESPONSE_TIMEOUT).await
}

/// Receive and decode one message, waiting at most `timeout`
pub async fn receive_timeout(
    socket: &UdpSocket,
    timeout: Duration,
) -> Result<(Message, SocketAddr), TransportError> {
    let mut buf = BytesMut::zeroed(MAX_PACKET_LEN);
    let (n, peer) = tokio::time::timeout(timeout, socket.recv_from(&mut buf[..]))
        .await
        .map_err(|_| TransportError::Timeout)??;
    buf.truncate(n);

    let msg = Message::decode(buf.freeze())?;
    Ok((msg, peer))
}

/// Decode one datagram, dispatch it, and send back any reply.
///
/// Undecodable datagrams are logged and dropped.
pub async fn handle_packet(
    socket: Arc<UdpSocket>,
    data: Bytes,
    peer: SocketAddr,
    handler: Arc<dyn RequestHandler>,
) {
    let msg = match Message::decode(data) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Error parsing datagram from {}: {}", peer, e);
            return;
        }
    };

    debug!("Received {} from {}", msg, peer);

    if let Some(mut reply) = handler.handle(&socket, peer, msg).await {
        debug!("Transmitting {} to {}", reply, peer);
        if let Err(e) = transmit(&socket, Some(peer), &mut reply).await {
            warn!("Failed to transmit reply to {}: {}", peer, e);
        }
    }
}

/// Serve requests on an already bound socket forever.
///
/// Every datagram is handled on its own task.
pub async fn serve(
    socket: UdpSocket,
    handler: Arc<dyn RequestHandler>,
) -> Result<(), TransportError> {
    let socket = Arc::new(socket);
    info!("Serving CoAP on {}", socket.local_addr()?);

    let mut failures: u32 = 0;
    loop {
        let mut buf = BytesMut::zeroed(MAX_PACKET_LEN);
        match socket.recv_from(&mut buf[..]).await {
            Ok((n, peer)) => {
                failures = 0;
                buf.truncate(n);
                tokio::spawn(handle_packet(
                    socket.clone(),
                    buf.freeze(),
                    peer,
                    handler.clone(),
                ));
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let pause = recv_backoff(failures);
                warn!(
                    "Error receiving datagram ({} in a row), retrying in {:?}: {}",
                    failures, pause, e
                );
                tokio::time::sleep(pause).await;
            }
        }
    }
}

/// Pause after `failures` consecutive read errors: doubles from
/// [`RECV_BACKOFF_BASE`] up to [`RECV_BACKOFF_MAX`]
fn recv_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    RECV_BACKOFF_BASE
        .saturating_mul(1 << shift)
        .min(RECV_BACKOFF_MAX)
}

/// Bind to `addr` and serve requests forever
pub async fn listen_and_serve(
    addr: SocketAddr,
    handler: Arc<dyn RequestHandler>,
) -> Result<(), TransportError> {
    let socket = UdpSocket::bind(addr).await?;
    serve(socket, handler).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::fn_handler;
    use coap_wire::{codes, MessageType, OptionId};
    use std::net::{IpAddr, Ipv4Addr};

    fn localhost() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0)
    }

    async fn start_echo_server() -> SocketAddr {
        let socket = UdpSocket::bind(localhost()).await.unwrap();
        let addr = socket.local_addr().unwrap();

        let handler = fn_handler(|_peer, req: Message| {
            if req.code != codes::GET {
                return None;
            }
            Some(
                Message::new(MessageType::Acknowledgement, codes::CONTENT, req.message_id)
                    .with_payload(req.path_string()),
            )
        });

        tokio::spawn(serve(socket, Arc::new(handler)));
        addr
    }

    #[tokio::test]
    async fn test_request_response() {
        let server = start_echo_server().await;

        let client = UdpSocket::bind(localhost()).await.unwrap();
        client.connect(server).await.unwrap();

        let mut req = Message::new(MessageType::Confirmable, codes::GET, 0x0101);
        req.set_path_string("sensors/temp");
        transmit(&client, None, &mut req).await.unwrap();

        let (resp, from) = receive(&client).await.unwrap();
        assert_eq!(from, server);
        assert_eq!(resp.typ, MessageType::Acknowledgement);
        assert_eq!(resp.code, codes::CONTENT);
        assert_eq!(resp.message_id, 0x0101);
        assert_eq!(&resp.payload[..], b"sensors/temp");
    }

    #[tokio::test]
    async fn test_malformed_datagram_is_dropped() {
        let server = start_echo_server().await;

        let client = UdpSocket::bind(localhost()).await.unwrap();
        client.send_to(&[0x40, 0x01, 0x00], server).await.unwrap();

        let mut req = Message::new(MessageType::Confirmable, codes::GET, 7)
            .with_option(OptionId::URI_PATH, "ok");
        transmit(&client, Some(server), &mut req).await.unwrap();

        let (resp, _) = receive(&client).await.unwrap();
        assert_eq!(resp.message_id, 7);
        assert_eq!(&resp.payload[..], b"ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_reply_times_out() {
        let server = start_echo_server().await;

        let client = UdpSocket::bind(localhost()).await.unwrap();
        let mut req = Message::new(MessageType::NonConfirmable, codes::DELETE, 9)
            .with_payload(Bytes::from_static(b"x"));
        req.add_option(OptionId::URI_PATH, "gone");
        transmit(&client, Some(server), &mut req).await.unwrap();

        // Paused clock: the full response timeout elapses without real waiting
        let started = tokio::time::Instant::now();
        let err = receive(&client).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
        assert!(started.elapsed() >= RESPONSE_TIMEOUT);
    }

    #[test]
    fn test_recv_backoff_doubles_up_to_cap() {
        assert_eq!(recv_backoff(1), RECV_BACKOFF_BASE);
        assert_eq!(recv_backoff(2), RECV_BACKOFF_BASE * 2);
        assert_eq!(recv_backoff(4), RECV_BACKOFF_BASE * 8);
        assert_eq!(recv_backoff(8), RECV_BACKOFF_MAX);
        assert_eq!(recv_backoff(u32::MAX), RECV_BACKOFF_MAX);
    }

    #[tokio::test]
    async fn test_transmit_rejects_invalid_message() {
        let client = UdpSocket::bind(localhost()).await.unwrap();
        let mut req = Message::new(MessageType::Confirmable, codes::GET, 1)
            .with_option(OptionId::IF_NONE_MATCH, coap_wire::OptionValue::Empty);

        let err = transmit(&client, Some(localhost()), &mut req)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Encode(_)));
    }

    #[tokio::test]
    async fn test_receive_rejects_short_datagram() {
        let receiver = UdpSocket::bind(localhost()).await.unwrap();
        let sender = UdpSocket::bind(localhost()).await.unwrap();
        sender
            .send_to(&[0x40, 0x01, 0x00, 0x01], receiver.local_addr().unwrap())
            .await
            .unwrap();

        let err = receive(&receiver).await.unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }
}
