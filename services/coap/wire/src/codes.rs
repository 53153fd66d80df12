//! Message types, method/response codes, and media types.
//!
//! All tables here are immutable constants and can be shared freely across
//! threads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message type (2-bit header field)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Confirmable, expects an acknowledgement
    Confirmable = 0,
    /// Non-confirmable
    NonConfirmable = 1,
    /// Acknowledgement of a confirmable message
    Acknowledgement = 2,
    /// Reset, the receiver could not process the message
    Reset = 3,
}

impl MessageType {
    /// Build from the 2-bit header field; higher bits are ignored
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => MessageType::Confirmable,
            1 => MessageType::NonConfirmable,
            2 => MessageType::Acknowledgement,
            _ => MessageType::Reset,
        }
    }

    /// Short name as used in protocol traces
    pub fn short_name(self) -> &'static str {
        match self {
            MessageType::Confirmable => "CON",
            MessageType::NonConfirmable => "NON",
            MessageType::Acknowledgement => "ACK",
            MessageType::Reset => "RST",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Empty message code (used by bare ACK/RST)
pub const EMPTY: u8 = 0;

/// GET method
pub const GET: u8 = 1;
/// POST method
pub const POST: u8 = 2;
/// PUT method
pub const PUT: u8 = 3;
/// DELETE method
pub const DELETE: u8 = 4;
/// SUBSCRIBE method
pub const SUBSCRIBE: u8 = 5;

/// 2.01 Created
pub const CREATED: u8 = 65;
/// 2.02 Deleted
pub const DELETED: u8 = 66;
/// 2.03 Valid
pub const VALID: u8 = 67;
/// 2.04 Changed
pub const CHANGED: u8 = 68;
/// 2.05 Content
pub const CONTENT: u8 = 69;

/// 4.00 Bad Request
pub const BAD_REQUEST: u8 = 128;
/// 4.01 Unauthorized
pub const UNAUTHORIZED: u8 = 129;
/// 4.02 Bad Option
pub const BAD_OPTION: u8 = 130;
/// 4.03 Forbidden
pub const FORBIDDEN: u8 = 131;
/// 4.04 Not Found
pub const NOT_FOUND: u8 = 132;
/// 4.05 Method Not Allowed
pub const METHOD_NOT_ALLOWED: u8 = 133;
/// 4.06 Not Acceptable
pub const NOT_ACCEPTABLE: u8 = 134;
/// 4.12 Precondition Failed
pub const PRECONDITION_FAILED: u8 = 140;
/// 4.13 Request Entity Too Large
pub const REQUEST_ENTITY_TOO_LARGE: u8 = 141;
/// 4.15 Unsupported Media Type
pub const UNSUPPORTED_MEDIA_TYPE: u8 = 143;

/// 5.00 Internal Server Error
pub const INTERNAL_SERVER_ERROR: u8 = 160;
/// 5.01 Not Implemented
pub const NOT_IMPLEMENTED: u8 = 161;
/// 5.02 Bad Gateway
pub const BAD_GATEWAY: u8 = 162;
/// 5.03 Service Unavailable
pub const SERVICE_UNAVAILABLE: u8 = 163;
/// 5.04 Gateway Timeout
pub const GATEWAY_TIMEOUT: u8 = 164;
/// 5.05 Proxying Not Supported
pub const PROXYING_NOT_SUPPORTED: u8 = 165;

/// Human-readable name for a method or response code
pub fn code_name(code: u8) -> Option<&'static str> {
    let name = match code {
        EMPTY => "Empty",
        GET => "GET",
        POST => "POST",
        PUT => "PUT",
        DELETE => "DELETE",
        SUBSCRIBE => "SUBSCRIBE",
        CREATED => "Created",
        DELETED => "Deleted",
        VALID => "Valid",
        CHANGED => "Changed",
        CONTENT => "Content",
        BAD_REQUEST => "BadRequest",
        UNAUTHORIZED => "Unauthorized",
        BAD_OPTION => "BadOption",
        FORBIDDEN => "Forbidden",
        NOT_FOUND => "NotFound",
        METHOD_NOT_ALLOWED => "MethodNotAllowed",
        NOT_ACCEPTABLE => "NotAcceptable",
        PRECONDITION_FAILED => "PreconditionFailed",
        REQUEST_ENTITY_TOO_LARGE => "RequestEntityTooLarge",
        UNSUPPORTED_MEDIA_TYPE => "UnsupportedMediaType",
        INTERNAL_SERVER_ERROR => "InternalServerError",
        NOT_IMPLEMENTED => "NotImplemented",
        BAD_GATEWAY => "BadGateway",
        SERVICE_UNAVAILABLE => "ServiceUnavailable",
        GATEWAY_TIMEOUT => "GatewayTimeout",
        PROXYING_NOT_SUPPORTED => "ProxyingNotSupported",
        _ => return None,
    };
    Some(name)
}

/// True for request method codes (1..=31)
pub fn is_request(code: u8) -> bool {
    (1..32).contains(&code)
}

/// True for response codes (64..=191)
pub fn is_response(code: u8) -> bool {
    (64..192).contains(&code)
}

/// Media types carried in Content-Type and Accept
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    /// text/plain;charset=utf-8
    TextPlain = 0,
    /// application/link-format
    AppLinkFormat = 40,
    /// application/xml
    AppXml = 41,
    /// application/octet-stream
    AppOctets = 42,
    /// application/exi
    AppExi = 47,
    /// application/json
    AppJson = 50,
}

impl MediaType {
    /// Look up a media type by its numeric value
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(MediaType::TextPlain),
            40 => Some(MediaType::AppLinkFormat),
            41 => Some(MediaType::AppXml),
            42 => Some(MediaType::AppOctets),
            47 => Some(MediaType::AppExi),
            50 => Some(MediaType::AppJson),
            _ => None,
        }
    }
}
