//! Wire protocol error types.

use crate::option::{OptionId, OptionKind};
use thiserror::Error;

/// Errors raised while encoding a message to its wire form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// More options than the 4-bit option count can carry
    #[error("too many options: {0} (max 14)")]
    TooManyOptions(usize),

    /// Consecutive sorted option ids are more than 15 apart
    #[error("option gap too large: {prev} -> {id}")]
    OptionGapTooLarge {
        /// Id of the previous option (0 for the first)
        prev: u8,
        /// Id of the option that could not be delta-encoded
        id: OptionId,
    },

    /// Option value does not fit the length extension (max 270 bytes)
    #[error("option {id} is too long: {len} bytes")]
    OptionTooLong {
        /// Offending option
        id: OptionId,
        /// Length of its wire value
        len: usize,
    },

    /// Value variant is not valid for the option's declared kind
    #[error("invalid option value type for option {id} (expects {kind:?})")]
    InvalidOptionValueType {
        /// Offending option
        id: OptionId,
        /// Kind the option id declares
        kind: OptionKind,
    },
}

/// Errors raised while decoding a datagram into a message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than the minimum message
    #[error("short packet: {0} bytes")]
    ShortPacket(usize),

    /// Version bits are not 1
    #[error("invalid version: {0}")]
    InvalidVersion(u8),

    /// Header option count above 14
    #[error("too many options: {0} (max 14)")]
    TooManyOptions(u8),

    /// Declared option length runs past the end of the datagram
    #[error("truncated: need {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the option entry declares
        needed: usize,
        /// Bytes left in the datagram
        remaining: usize,
    },

    /// Accumulated option delta overflowed the id space.
    ///
    /// Not reachable from a well-formed header: 14 options of delta 15 end
    /// at id 210.
    #[error("invalid option id: {0}")]
    InvalidOptionId(u16),
}
