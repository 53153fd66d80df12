//! Encoding and decoding of complete messages.
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |Ver| T |  OC   |      Code     |          Message ID           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |   Options (if any) ...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |   Payload (if any) ...
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Each option entry is a delta/length byte, an extension byte when the
//! length nibble is 15, then the value:
//!
//! ```text
//! +---+---+---+---+---+---+---+---+
//! | Option Delta  |    Length     |   length 0..14
//! +---+---+---+---+---+---+---+---+
//!
//! +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//! | Option Delta  | 1   1   1   1 |          Length - 15          |
//! +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//! ```

use crate::codes::MessageType;
use crate::error::{DecodeError, EncodeError};
use crate::message::Message;
use crate::option::{CoapOption, OptionId};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

/// Protocol version carried in the top two header bits
pub const VERSION: u8 = 1;

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 4;

/// Smallest datagram accepted by the decoder
pub const MIN_MESSAGE_SIZE: usize = 6;

/// Largest option count the 4-bit header field may carry
pub const MAX_OPTIONS: usize = 14;

/// Largest id delta a single option entry can express
pub const MAX_OPTION_DELTA: u8 = 15;

/// Length nibble value that signals an extension byte
const LENGTH_EXTENDED: u8 = 15;

/// Largest option value length (15 + 255)
pub const MAX_OPTION_LEN: usize = LENGTH_EXTENDED as usize + u8::MAX as usize;

/// Encoded size of a message, assuming it is valid
pub fn encoded_size(msg: &Message) -> usize {
    let options: usize = msg
        .options
        .iter()
        .map(|o| {
            let len = o.value.wire_len();
            let prefix = if len >= LENGTH_EXTENDED as usize { 2 } else { 1 };
            prefix + len
        })
        .sum();
    HEADER_SIZE + options + msg.payload.len()
}

/// Encode a message to its wire form.
///
/// The message's options are stable-sorted by id in place, so repeated ids
/// keep their relative order.
pub fn encode(msg: &mut Message) -> Result<Bytes, EncodeError> {
    if msg.options.len() > MAX_OPTIONS {
        return Err(EncodeError::TooManyOptions(msg.options.len()));
    }

    let mut buf = BytesMut::with_capacity(encoded_size(msg));

    buf.put_u8((VERSION << 6) | ((msg.typ as u8) << 4) | (msg.options.len() as u8 & 0x0F));
    buf.put_u8(msg.code);
    buf.put_u16(msg.message_id);

    msg.options.sort_by_key(|o| o.id);

    let mut prev: u8 = 0;
    for opt in &msg.options {
        let delta = opt.id.0 - prev;
        if delta > MAX_OPTION_DELTA {
            return Err(EncodeError::OptionGapTooLarge { prev, id: opt.id });
        }

        let value = opt.to_wire()?;
        let len = value.len();
        if len > MAX_OPTION_LEN {
            return Err(EncodeError::OptionTooLong { id: opt.id, len });
        }

        if len >= LENGTH_EXTENDED as usize {
            buf.put_u8((delta << 4) | LENGTH_EXTENDED);
            buf.put_u8((len - LENGTH_EXTENDED as usize) as u8);
        } else {
            buf.put_u8((delta << 4) | len as u8);
        }
        buf.put_slice(&value);

        trace!(id = %opt.id, delta, len, "encoded option");
        prev = opt.id.0;
    }

    buf.put_slice(&msg.payload);

    debug!(size = buf.len(), "encoded {}", msg);
    Ok(buf.freeze())
}

/// Decode a datagram into a message.
///
/// Option values and the payload are zero-copy slices of `data`.
pub fn decode(mut data: Bytes) -> Result<Message, DecodeError> {
    if data.len() < MIN_MESSAGE_SIZE {
        return Err(DecodeError::ShortPacket(data.len()));
    }

    let first = data.get_u8();
    let version = first >> 6;
    if version != VERSION {
        return Err(DecodeError::InvalidVersion(version));
    }

    let typ = MessageType::from_bits(first >> 4);
    let count = first & 0x0F;
    if count as usize > MAX_OPTIONS {
        return Err(DecodeError::TooManyOptions(count));
    }

    let code = data.get_u8();
    let message_id = data.get_u16();

    let mut options = Vec::with_capacity(count as usize);
    let mut prev: u16 = 0;
    for _ in 0..count {
        if !data.has_remaining() {
            break;
        }

        let entry = data.get_u8();
        let id = prev + u16::from(entry >> 4);
        if id > u16::from(u8::MAX) {
            return Err(DecodeError::InvalidOptionId(id));
        }

        let mut len = (entry & 0x0F) as usize;
        if len == LENGTH_EXTENDED as usize {
            if !data.has_remaining() {
                return Err(DecodeError::Truncated {
                    needed: 1,
                    remaining: 0,
                });
            }
            len += data.get_u8() as usize;
        }

        if data.len() < len {
            return Err(DecodeError::Truncated {
                needed: len,
                remaining: data.len(),
            });
        }

        let raw = data.split_to(len);
        trace!(id, len, "decoded option");
        options.push(CoapOption::from_wire(OptionId(id as u8), raw));
        prev = id;
    }

    let msg = Message {
        typ,
        code,
        message_id,
        options,
        payload: data,
    };
    debug!("decoded {}", msg);
    Ok(msg)
}

impl Message {
    /// Encode this message; see [`encode`]
    pub fn encode(&mut self) -> Result<Bytes, EncodeError> {
        encode(self)
    }

    /// Decode a message from a datagram; see [`decode`]
    pub fn decode(data: Bytes) -> Result<Self, DecodeError> {
        decode(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::{self, MediaType};
    use crate::option::OptionValue;

    fn get(path: &str) -> Message {
        let mut msg = Message::new(MessageType::Confirmable, codes::GET, 0x1234);
        msg.set_path_string(path);
        msg
    }

    #[test]
    fn test_header_layout() {
        let mut msg = Message::new(MessageType::Acknowledgement, codes::CONTENT, 0xBEEF)
            .with_payload(Bytes::from_static(b"ok"));
        let bytes = msg.encode().unwrap();
        assert_eq!(&bytes[..], &[0x60, 69, 0xBE, 0xEF, b'o', b'k']);
    }

    #[test]
    fn test_encode_known_bytes() {
        let mut msg = get("a/bc").with_option(OptionId::CONTENT_TYPE, MediaType::AppJson);
        let bytes = msg.encode().unwrap();
        assert_eq!(
            &bytes[..],
            &[
                0x43, 0x01, 0x12, 0x34, // ver=1 CON oc=3, GET, mid
                0x11, 50, // Content-Type delta 1 len 1
                0x81, b'a', // Uri-Path delta 8 len 1
                0x02, b'b', b'c', // Uri-Path delta 0 len 2
            ]
        );
    }

    #[test]
    fn test_encode_sorts_stably() {
        let mut msg = Message::new(MessageType::NonConfirmable, codes::POST, 9);
        msg.add_option(OptionId::URI_PATH, "first");
        msg.add_option(OptionId::CONTENT_TYPE, 0u32);
        msg.add_option(OptionId::URI_PATH, "second");
        msg.add_option(OptionId::URI_HOST, "host");
        msg.add_option(OptionId::URI_PATH, "third");

        msg.encode().unwrap();

        let ids: Vec<u8> = msg.options.iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![1, 5, 9, 9, 9]);
        assert_eq!(msg.path(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_roundtrip() {
        let mut msg = Message::new(MessageType::Confirmable, codes::PUT, 0xFFFF)
            .with_option(OptionId::MAX_AGE, 3600u32)
            .with_option(OptionId::ETAG, vec![0xAAu8, 0xBB])
            .with_option(OptionId::URI_HOST, "example.com")
            .with_option(OptionId::URI_PORT, 5683u16)
            .with_option(OptionId::TOKEN, vec![1u8, 2, 3, 4])
            .with_option(OptionId::ACCEPT, MediaType::TextPlain)
            .with_option(OptionId::URI_QUERY, "a=1")
            .with_payload(Bytes::from_static(b"payload"));
        msg.set_path(["x", "y"]);

        let bytes = msg.encode().unwrap();
        assert_eq!(bytes.len(), encoded_size(&msg));

        let decoded = Message::decode(bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_roundtrip_if_none_match() {
        let mut msg = Message::new(MessageType::Confirmable, codes::PUT, 1)
            .with_option(OptionId::URI_QUERY, "q")
            .with_option(OptionId::IF_NONE_MATCH, OptionValue::Empty)
            .with_payload(Bytes::from_static(b"!"));
        let bytes = msg.encode().unwrap();
        let decoded = decode(bytes).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_length_extension_boundaries() {
        for (len, entry) in [(14usize, vec![0x4Eu8]), (15, vec![0x4F, 0]), (270, vec![0x4F, 255])] {
            let value = vec![0x5Au8; len];
            let mut msg = Message::new(MessageType::Confirmable, codes::GET, 1)
                .with_option(OptionId::ETAG, value.clone())
                .with_payload(Bytes::from_static(&[0xFF]));
            let bytes = msg.encode().unwrap();
            assert_eq!(&bytes[4..4 + entry.len()], &entry[..], "len {}", len);
            assert_eq!(bytes.len(), 4 + entry.len() + len + 1);

            let decoded = decode(bytes).unwrap();
            assert_eq!(decoded.option(OptionId::ETAG), Some(&OptionValue::from(value)));
            assert_eq!(&decoded.payload[..], &[0xFF]);
        }
    }

    #[test]
    fn test_option_too_long() {
        let mut msg = Message::new(MessageType::Confirmable, codes::GET, 1)
            .with_option(OptionId::ETAG, vec![0u8; 271]);
        assert_eq!(
            msg.encode().unwrap_err(),
            EncodeError::OptionTooLong {
                id: OptionId::ETAG,
                len: 271
            }
        );
    }

    #[test]
    fn test_integer_minimal_encoding_on_wire() {
        for (value, expected) in [
            (0u32, vec![0x20u8]),
            (255, vec![0x21, 0xFF]),
            (256, vec![0x22, 0x01, 0x00]),
            (16_777_215, vec![0x23, 0xFF, 0xFF, 0xFF]),
            (16_777_216, vec![0x24, 0x01, 0x00, 0x00, 0x00]),
        ] {
            let mut msg = Message::new(MessageType::Confirmable, codes::GET, 0)
                .with_option(OptionId::MAX_AGE, value)
                .with_payload(Bytes::from_static(b"p"));
            let bytes = msg.encode().unwrap();
            assert_eq!(&bytes[4..bytes.len() - 1], &expected[..], "value {}", value);

            let decoded = decode(bytes).unwrap();
            assert_eq!(decoded.option(OptionId::MAX_AGE), Some(&OptionValue::Uint(value)));
        }
    }

    #[test]
    fn test_gap_too_large() {
        let mut msg = Message::new(MessageType::Confirmable, codes::GET, 1)
            .with_option(OptionId::CONTENT_TYPE, 0u32)
            .with_option(OptionId::IF_NONE_MATCH, OptionValue::Empty);
        assert_eq!(
            msg.encode().unwrap_err(),
            EncodeError::OptionGapTooLarge {
                prev: 1,
                id: OptionId::IF_NONE_MATCH
            }
        );

        // First option is measured from zero
        let mut msg = Message::new(MessageType::Confirmable, codes::GET, 1)
            .with_option(OptionId::IF_NONE_MATCH, OptionValue::Empty);
        assert!(matches!(
            msg.encode(),
            Err(EncodeError::OptionGapTooLarge { prev: 0, .. })
        ));

        // Bridging option keeps every delta within 15
        let mut msg = Message::new(MessageType::Confirmable, codes::GET, 1)
            .with_option(OptionId::CONTENT_TYPE, 0u32)
            .with_option(OptionId::URI_QUERY, "q")
            .with_option(OptionId::IF_NONE_MATCH, OptionValue::Empty);
        assert!(msg.encode().is_ok());
    }

    #[test]
    fn test_too_many_options() {
        let mut msg = Message::new(MessageType::Confirmable, codes::GET, 1);
        for i in 0..15 {
            msg.add_option(OptionId::URI_PATH, format!("p{}", i));
        }
        assert_eq!(msg.encode().unwrap_err(), EncodeError::TooManyOptions(15));

        msg.options.pop();
        let bytes = msg.encode().unwrap();
        assert_eq!(bytes[0] & 0x0F, 14);
        assert_eq!(decode(bytes).unwrap().path().len(), 14);
    }

    #[test]
    fn test_invalid_value_type() {
        let mut msg = Message::new(MessageType::Confirmable, codes::GET, 1)
            .with_option(OptionId::CONTENT_TYPE, "json");
        assert!(matches!(
            msg.encode(),
            Err(EncodeError::InvalidOptionValueType { .. })
        ));
    }

    #[test]
    fn test_raw_values_roundtrip_as_declared_kind() {
        let mut msg = Message::new(MessageType::Confirmable, codes::GET, 3)
            .with_option(OptionId::CONTENT_TYPE, OptionValue::Empty)
            .with_option(OptionId::URI_PATH, Bytes::from_static(b"abc"))
            .with_payload(Bytes::from_static(b"p"));
        assert_eq!(msg.option(OptionId::CONTENT_TYPE), Some(&OptionValue::Uint(0)));

        let decoded = decode(msg.encode().unwrap()).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.path(), vec!["abc"]);
    }

    #[test]
    fn test_encode_rejects_raw_values_that_would_retype() {
        let mut msg = Message::new(MessageType::Confirmable, codes::GET, 3);
        msg.options.push(CoapOption {
            id: OptionId::CONTENT_TYPE,
            value: OptionValue::Empty,
        });
        assert_eq!(
            msg.encode().unwrap_err(),
            EncodeError::InvalidOptionValueType {
                id: OptionId::CONTENT_TYPE,
                kind: crate::option::OptionKind::Uint,
            }
        );

        let mut msg = Message::new(MessageType::Confirmable, codes::GET, 3);
        msg.options.push(CoapOption {
            id: OptionId::URI_PATH,
            value: OptionValue::Opaque(Bytes::from_static(b"abc")),
        });
        assert!(matches!(
            msg.encode(),
            Err(EncodeError::InvalidOptionValueType { .. })
        ));
    }

    #[test]
    fn test_decode_highest_reachable_option_id() {
        // 14 options, each a delta of 15, ends at id 210
        let mut data = vec![0x4E, 1, 0, 1];
        data.extend_from_slice(&[0xF0; MAX_OPTIONS]);
        data.extend_from_slice(b"p!");
        let msg = decode(Bytes::from(data)).unwrap();
        assert_eq!(msg.options.len(), MAX_OPTIONS);
        assert_eq!(msg.options.last().map(|o| o.id), Some(OptionId(210)));
    }

    #[test]
    fn test_decode_short_packet() {
        assert_eq!(
            decode(Bytes::from_static(&[0x40, 1, 0, 1, 0])).unwrap_err(),
            DecodeError::ShortPacket(5)
        );
        assert_eq!(decode(Bytes::new()).unwrap_err(), DecodeError::ShortPacket(0));
    }

    #[test]
    fn test_decode_invalid_version() {
        assert_eq!(
            decode(Bytes::from_static(&[0x80, 1, 0, 1, 0, 0])).unwrap_err(),
            DecodeError::InvalidVersion(2)
        );
        assert_eq!(
            decode(Bytes::from_static(&[0x00, 1, 0, 1, 0, 0])).unwrap_err(),
            DecodeError::InvalidVersion(0)
        );
    }

    #[test]
    fn test_decode_reserved_option_count() {
        assert_eq!(
            decode(Bytes::from_static(&[0x4F, 1, 0, 1, 0, 0])).unwrap_err(),
            DecodeError::TooManyOptions(15)
        );
    }

    #[test]
    fn test_decode_truncated_value() {
        // One Uri-Path option claiming 10 bytes, 3 present
        let data = Bytes::from_static(&[0x41, 1, 0, 1, 0x9A, b'a', b'b', b'c']);
        assert_eq!(
            decode(data).unwrap_err(),
            DecodeError::Truncated {
                needed: 10,
                remaining: 3
            }
        );
    }

    #[test]
    fn test_decode_missing_extension_byte() {
        let data = Bytes::from_static(&[0x42, 1, 0, 1, 0x11, 0x00, 0x3F]);
        assert_eq!(
            decode(data).unwrap_err(),
            DecodeError::Truncated {
                needed: 1,
                remaining: 0
            }
        );
    }

    #[test]
    fn test_decode_stops_when_input_exhausted() {
        // Header claims 3 options but only one is present
        let data = Bytes::from_static(&[0x43, 1, 0, 7, 0x91, b'x']);
        let msg = decode(data).unwrap();
        assert_eq!(msg.path(), vec!["x"]);
        assert!(msg.payload.is_empty());
        assert_eq!(msg.message_id, 7);
    }

    #[test]
    fn test_decode_unsorted_is_accepted() {
        // Zero deltas after a first option are legal and not re-validated
        let data = Bytes::from_static(&[0x42, 1, 0, 1, 0x41, 0xAA, 0x01, 0xBB, 0xCC]);
        let msg = decode(data).unwrap();
        assert_eq!(msg.options_with(OptionId::ETAG).count(), 2);
        assert_eq!(&msg.payload[..], &[0xCC]);
    }

    #[test]
    fn test_decode_oversized_integer_kept_opaque() {
        let data = Bytes::from_static(&[0x41, 1, 0, 1, 0x25, 0, 0, 0, 0, 9]);
        let mut msg = decode(data.clone()).unwrap();
        assert_eq!(
            msg.option(OptionId::MAX_AGE),
            Some(&OptionValue::Opaque(Bytes::from_static(&[0, 0, 0, 0, 9])))
        );
        assert_eq!(msg.encode().unwrap(), data);
    }

    #[test]
    fn test_payload_passthrough() {
        let payload = Bytes::from_static(&[0x00, 0xFF, 0x00, 0x00, 0x41, 0x00]);
        let mut msg = Message::new(MessageType::NonConfirmable, codes::POST, 0x0102)
            .with_payload(payload.clone());
        let bytes = msg.encode().unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + payload.len());

        let decoded = decode(bytes).unwrap();
        assert!(decoded.options.is_empty());
        assert_eq!(decoded.payload, payload);
        assert_eq!(decoded, msg);
    }
}
