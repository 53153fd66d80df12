//! Option model: identifiers, value kinds, and per-kind wire rules.
//!
//! ```text
//! +-----+----------------+--------+---------+
//! | No. | Name           | Format | Length  |
//! +-----+----------------+--------+---------+
//! |   1 | Content-Type   | uint   | 0-2 B   |
//! |   2 | Max-Age        | uint   | 0-4 B   |
//! |   3 | Proxy-Uri      | string | 1-270 B |
//! |   4 | ETag           | opaque | 1-8 B   |
//! |   5 | Uri-Host       | string | 1-270 B |
//! |   6 | Location-Path  | string | 0-270 B |
//! |   7 | Uri-Port       | uint   | 0-2 B   |
//! |   8 | Location-Query | string | 0-270 B |
//! |   9 | Uri-Path       | string | 0-270 B |
//! |  11 | Token          | opaque | 1-8 B   |
//! |  12 | Accept         | uint   | 0-2 B   |
//! |  13 | If-Match       | opaque | 0-8 B   |
//! |  15 | Uri-Query      | string | 0-270 B |
//! |  21 | If-None-Match  | empty  | 0 B     |
//! +-----+----------------+--------+---------+
//! ```

use crate::codes::MediaType;
use crate::error::EncodeError;
use crate::uint::{decode_uint, encode_uint, uint_len, UintBytes, MAX_UINT_LEN};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Option identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(pub u8);

impl OptionId {
    /// Content-Type (uint)
    pub const CONTENT_TYPE: OptionId = OptionId(1);
    /// Max-Age (uint)
    pub const MAX_AGE: OptionId = OptionId(2);
    /// Proxy-Uri (string)
    pub const PROXY_URI: OptionId = OptionId(3);
    /// ETag (opaque)
    pub const ETAG: OptionId = OptionId(4);
    /// Uri-Host (string)
    pub const URI_HOST: OptionId = OptionId(5);
    /// Location-Path (string)
    pub const LOCATION_PATH: OptionId = OptionId(6);
    /// Uri-Port (uint)
    pub const URI_PORT: OptionId = OptionId(7);
    /// Location-Query (string)
    pub const LOCATION_QUERY: OptionId = OptionId(8);
    /// Uri-Path (string)
    pub const URI_PATH: OptionId = OptionId(9);
    /// Token (opaque)
    pub const TOKEN: OptionId = OptionId(11);
    /// Accept (uint)
    pub const ACCEPT: OptionId = OptionId(12);
    /// If-Match (opaque)
    pub const IF_MATCH: OptionId = OptionId(13);
    /// Uri-Query (string)
    pub const URI_QUERY: OptionId = OptionId(15);
    /// If-None-Match (empty)
    pub const IF_NONE_MATCH: OptionId = OptionId(21);

    fn lookup(self) -> Option<(&'static str, OptionKind)> {
        let entry = match self {
            Self::CONTENT_TYPE => ("Content-Type", OptionKind::Uint),
            Self::MAX_AGE => ("Max-Age", OptionKind::Uint),
            Self::PROXY_URI => ("Proxy-Uri", OptionKind::String),
            Self::ETAG => ("ETag", OptionKind::Opaque),
            Self::URI_HOST => ("Uri-Host", OptionKind::String),
            Self::LOCATION_PATH => ("Location-Path", OptionKind::String),
            Self::URI_PORT => ("Uri-Port", OptionKind::Uint),
            Self::LOCATION_QUERY => ("Location-Query", OptionKind::String),
            Self::URI_PATH => ("Uri-Path", OptionKind::String),
            Self::TOKEN => ("Token", OptionKind::Opaque),
            Self::ACCEPT => ("Accept", OptionKind::Uint),
            Self::IF_MATCH => ("If-Match", OptionKind::Opaque),
            Self::URI_QUERY => ("Uri-Query", OptionKind::String),
            Self::IF_NONE_MATCH => ("If-None-Match", OptionKind::Empty),
            _ => return None,
        };
        Some(entry)
    }

    /// Whether this id is in the option table
    pub fn is_known(self) -> bool {
        self.lookup().is_some()
    }

    /// Value kind declared for this id; unknown ids are opaque
    pub fn kind(self) -> OptionKind {
        self.lookup()
            .map(|(_, kind)| kind)
            .unwrap_or(OptionKind::Opaque)
    }

    /// Registered name, if any
    pub fn name(self) -> Option<&'static str> {
        self.lookup().map(|(name, _)| name)
    }
}

impl From<u8> for OptionId {
    fn from(id: u8) -> Self {
        OptionId(id)
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({})", name, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Semantic kind of an option value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionKind {
    /// Unsigned integer, minimal big-endian
    Uint,
    /// UTF-8 text
    String,
    /// Raw bytes
    Opaque,
    /// Always zero-length
    Empty,
}

/// Option value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionValue {
    /// Zero-length value
    Empty,
    /// Unsigned integer
    Uint(u32),
    /// UTF-8 text
    String(String),
    /// Raw bytes
    Opaque(Bytes),
}

impl OptionValue {
    /// Integer content, if this is a `Uint`
    pub fn as_uint(&self) -> Option<u32> {
        match self {
            OptionValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Text content, if this is a `String`
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Length of the wire form
    pub fn wire_len(&self) -> usize {
        match self {
            OptionValue::Empty => 0,
            OptionValue::Uint(v) => uint_len(*v),
            OptionValue::String(s) => s.len(),
            OptionValue::Opaque(b) => b.len(),
        }
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        OptionValue::Uint(v)
    }
}

impl From<u16> for OptionValue {
    fn from(v: u16) -> Self {
        OptionValue::Uint(v.into())
    }
}

impl From<u8> for OptionValue {
    fn from(v: u8) -> Self {
        OptionValue::Uint(v.into())
    }
}

impl From<MediaType> for OptionValue {
    fn from(v: MediaType) -> Self {
        OptionValue::Uint(v as u32)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::String(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::String(v)
    }
}

impl From<&[u8]> for OptionValue {
    fn from(v: &[u8]) -> Self {
        OptionValue::Opaque(Bytes::copy_from_slice(v))
    }
}

impl From<Vec<u8>> for OptionValue {
    fn from(v: Vec<u8>) -> Self {
        OptionValue::Opaque(Bytes::from(v))
    }
}

impl From<Bytes> for OptionValue {
    fn from(v: Bytes) -> Self {
        OptionValue::Opaque(v)
    }
}

/// Encoded value bytes of one option
#[derive(Debug)]
pub enum WireValue<'a> {
    /// Borrowed from the option's own storage
    Borrowed(&'a [u8]),
    /// Minimal integer encoding
    Inline(UintBytes),
}

impl Deref for WireValue<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            WireValue::Borrowed(b) => b,
            WireValue::Inline(b) => b.as_slice(),
        }
    }
}

/// A single option: identifier plus value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoapOption {
    /// Option identifier
    pub id: OptionId,
    /// Option value
    pub value: OptionValue,
}

impl CoapOption {
    /// Create an option from anything convertible to a value.
    ///
    /// Raw values (`Empty`, `Opaque`) are re-read as the id's declared kind,
    /// and typed values under unknown ids become `Opaque`, so the option
    /// holds exactly what decoding its wire bytes would yield. A typed value
    /// that contradicts a known id is kept and rejected at encode time.
    pub fn new(id: OptionId, value: impl Into<OptionValue>) -> Self {
        let value = match value.into() {
            OptionValue::Empty => return Self::from_wire(id, Bytes::new()),
            OptionValue::Opaque(raw) => return Self::from_wire(id, raw),
            OptionValue::Uint(v) if !id.is_known() => {
                OptionValue::Opaque(Bytes::copy_from_slice(&encode_uint(v)))
            }
            OptionValue::String(s) if !id.is_known() => OptionValue::Opaque(Bytes::from(s)),
            typed => typed,
        };
        Self { id, value }
    }

    /// Whether the value is the form [`CoapOption::from_wire`] produces for
    /// its own wire bytes under this id.
    ///
    /// Raw values under typed ids are valid only when the bytes do not fit
    /// the kind: integers over 4 bytes, invalid UTF-8, or a non-empty value
    /// under an empty-kind id.
    pub fn is_valid(&self) -> bool {
        match (self.id.kind(), &self.value) {
            (OptionKind::Uint, OptionValue::Uint(_)) => true,
            (OptionKind::Uint, OptionValue::Opaque(b)) => b.len() > MAX_UINT_LEN,
            (OptionKind::String, OptionValue::String(_)) => true,
            (OptionKind::String, OptionValue::Opaque(b)) => std::str::from_utf8(b).is_err(),
            (OptionKind::Empty, OptionValue::Empty) => true,
            (OptionKind::Empty, OptionValue::Opaque(b)) => !b.is_empty(),
            (OptionKind::Opaque, OptionValue::Opaque(_)) => true,
            _ => false,
        }
    }

    /// Raw wire bytes of the value
    pub fn to_wire(&self) -> Result<WireValue<'_>, EncodeError> {
        if !self.is_valid() {
            return Err(EncodeError::InvalidOptionValueType {
                id: self.id,
                kind: self.id.kind(),
            });
        }

        Ok(match &self.value {
            OptionValue::Empty => WireValue::Borrowed(&[]),
            OptionValue::Uint(v) => WireValue::Inline(encode_uint(*v)),
            OptionValue::String(s) => WireValue::Borrowed(s.as_bytes()),
            OptionValue::Opaque(b) => WireValue::Borrowed(&b[..]),
        })
    }

    /// Rebuild an option from its raw wire bytes.
    ///
    /// Bytes that do not fit the declared kind (integers over 4 bytes,
    /// invalid UTF-8, a non-empty empty-kind value) are kept as `Opaque`.
    pub fn from_wire(id: OptionId, raw: Bytes) -> Self {
        let value = match id.kind() {
            OptionKind::Uint => match decode_uint(&raw) {
                Some(v) => OptionValue::Uint(v),
                None => OptionValue::Opaque(raw),
            },
            OptionKind::String => match std::str::from_utf8(&raw) {
                Ok(s) => OptionValue::String(s.to_string()),
                Err(_) => OptionValue::Opaque(raw),
            },
            OptionKind::Empty if raw.is_empty() => OptionValue::Empty,
            OptionKind::Empty | OptionKind::Opaque => OptionValue::Opaque(raw),
        };
        Self { id, value }
    }
}
