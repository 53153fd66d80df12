//! Request handler trait and closure adapter.

use async_trait::async_trait;
use coap_wire::Message;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

/// Handles inbound messages and optionally returns a reply
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// Handle a decoded message from `peer`.
    ///
    /// The returned message, if any, is transmitted back to `peer` on
    /// `socket`.
    async fn handle(&self, socket: &UdpSocket, peer: SocketAddr, msg: Message) -> Option<Message>;
}

/// Adapter turning a plain function into a [`RequestHandler`]
pub struct FnHandler<F> {
    f: F,
}

/// Build a handler from a function
pub fn fn_handler<F>(f: F) -> FnHandler<F>
where
    F: Fn(SocketAddr, Message) -> Option<Message> + Send + Sync + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(SocketAddr, Message) -> Option<Message> + Send + Sync + 'static,
{
    async fn handle(&self, _socket: &UdpSocket, peer: SocketAddr, msg: Message) -> Option<Message> {
        (self.f)(peer, msg)
    }
}
