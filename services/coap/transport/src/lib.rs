//! UDP datagram transport and request dispatch for CoAP messages.
//!
//! Each datagram carries exactly one message; there is no framing at this
//! layer. Inbound datagrams are decoded and handed to a [`RequestHandler`]
//! on their own task, and any reply is sent back to the peer.
//!
//! Acknowledgement tracking, retransmission, and deduplication are left to
//! the caller.
//!
//! ## Example
//!
//! ```rust,no_run
//! use coap_transport::{fn_handler, listen_and_serve};
//! use coap_wire::{codes, Message, MessageType};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handler = fn_handler(|_peer, req: Message| {
//!     let typ = if req.is_confirmable() {
//!         MessageType::Acknowledgement
//!     } else {
//!         MessageType::NonConfirmable
//!     };
//!     Some(Message::new(typ, codes::CONTENT, req.message_id).with_payload(req.path_string()))
//! });
//!
//! listen_and_serve("0.0.0.0:5683".parse()?, Arc::new(handler)).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod handler;
pub mod udp;

// Re-export main types
pub use error::TransportError;
pub use handler::{fn_handler, FnHandler, RequestHandler};
pub use udp::{
    handle_packet, listen_and_serve, receive, receive_timeout, serve, transmit, MAX_PACKET_LEN,
    RESPONSE_TIMEOUT,
};
