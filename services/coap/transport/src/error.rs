//! Transport error types.

use coap_wire::{DecodeError, EncodeError};
use thiserror::Error;

/// Errors raised while sending or receiving messages
#[derive(Error, Debug)]
pub enum TransportError {
    /// Socket error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound message could not be encoded
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Inbound datagram could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// No datagram arrived within the response timeout
    #[error("timed out waiting for response")]
    Timeout,
}
