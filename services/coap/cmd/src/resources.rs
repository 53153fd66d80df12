//! Demo resource handler served by `coap serve`.

use async_trait::async_trait;
use coap_transport::RequestHandler;
use coap_wire::{codes, MediaType, Message, MessageType, OptionId};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use tokio::net::UdpSocket;

use crate::{component_debug, component_warn};

/// Link-format description served at `.well-known/core`
const CORE_LINKS: &str = "</.well-known/core>;ct=40,</echo>;ct=0";

/// Echo resources: GET returns the request path, PUT/POST return the payload
pub struct EchoResources {
    next_message_id: AtomicU16,
}

impl EchoResources {
    /// Create the handler; `first_message_id` seeds non-confirmable replies
    pub fn new(first_message_id: u16) -> Self {
        Self {
            next_message_id: AtomicU16::new(first_message_id),
        }
    }

    /// Build the reply skeleton.
    ///
    /// Confirmable requests get a piggy-backed ACK with the same message ID,
    /// others a non-confirmable response with a fresh ID. The token is
    /// copied so the client can match the response.
    fn reply_to(&self, req: &Message, code: u8) -> Message {
        let mut resp = if req.is_confirmable() {
            Message::new(MessageType::Acknowledgement, code, req.message_id)
        } else {
            let message_id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
            Message::new(MessageType::NonConfirmable, code, message_id)
        };
        if let Some(token) = req.option(OptionId::TOKEN) {
            resp.add_option(OptionId::TOKEN, token.clone());
        }
        resp
    }

    fn respond(&self, req: &Message) -> Option<Message> {
        if req.code == codes::EMPTY {
            // Empty confirmable message is a ping
            return req
                .is_confirmable()
                .then(|| Message::new(MessageType::Reset, codes::EMPTY, req.message_id));
        }

        if !codes::is_request(req.code) {
            component_warn!("server", "Ignoring non-request {}", req);
            return None;
        }

        let path = req.path_string();
        let resp = match req.code {
            codes::GET if path == ".well-known/core" => self
                .reply_to(req, codes::CONTENT)
                .with_option(OptionId::CONTENT_TYPE, MediaType::AppLinkFormat)
                .with_payload(CORE_LINKS),
            codes::GET => self
                .reply_to(req, codes::CONTENT)
                .with_option(OptionId::CONTENT_TYPE, MediaType::TextPlain)
                .with_payload(path),
            codes::PUT | codes::POST => self
                .reply_to(req, codes::CHANGED)
                .with_payload(req.payload.clone()),
            _ => self.reply_to(req, codes::METHOD_NOT_ALLOWED),
        };
        Some(resp)
    }
}

#[async_trait]
impl RequestHandler for EchoResources {
    async fn handle(&self, _socket: &UdpSocket, peer: SocketAddr, msg: Message) -> Option<Message> {
        component_debug!("server", "Request {} from {}", msg, peer);
        self.respond(&msg)
    }
}
