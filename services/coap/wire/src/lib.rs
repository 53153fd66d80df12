//! CoAP message model and byte-exact wire encoding/decoding.
//!
//! This crate provides the message representation, the option table, and the
//! codec that turns a [`Message`] into a single datagram and back. It holds no
//! state: every encode and decode call is independent and may run
//! concurrently with any other on different inputs.
//!
//! ## Wire Format
//!
//! ```text
//! +----------------------+----------------------------------+
//! | Header (4B)          | ver | type | option count       |
//! |                      | code | message id (u16 BE)       |
//! +----------------------+----------------------------------+
//! | Option entries       | delta/length byte, optional      |
//! | (0..14)              | extension byte, value bytes      |
//! +----------------------+----------------------------------+
//! | Payload              | remaining bytes, no length prefix|
//! +----------------------+----------------------------------+
//! ```
//!
//! ## Example
//!
//! ```rust
//! use coap_wire::{codes, Message, MessageType, OptionId};
//!
//! let mut request = Message::new(MessageType::Confirmable, codes::GET, 0x7d34);
//! request.set_path_string("sensors/temp");
//! request.add_option(OptionId::ACCEPT, 0u32);
//!
//! let datagram = request.encode().unwrap();
//! let decoded = Message::decode(datagram).unwrap();
//! assert_eq!(decoded.path_string(), "sensors/temp");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod codes;
pub mod error;
pub mod message;
pub mod option;
pub mod uint;

// Re-export main types
pub use codec::{
    decode, encode, encoded_size, HEADER_SIZE, MAX_OPTIONS, MAX_OPTION_DELTA, MAX_OPTION_LEN,
    MIN_MESSAGE_SIZE, VERSION,
};
pub use codes::{code_name, MediaType, MessageType};
pub use error::{DecodeError, EncodeError};
pub use message::Message;
pub use option::{CoapOption, OptionId, OptionKind, OptionValue, WireValue};
pub use uint::{decode_uint, encode_uint};
