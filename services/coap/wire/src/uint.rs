//! Minimal big-endian unsigned integer helpers for option values.

use smallvec::SmallVec;

/// Largest wire length of an integer option value
pub const MAX_UINT_LEN: usize = 4;

/// Inline buffer for an encoded integer value
pub type UintBytes = SmallVec<[u8; MAX_UINT_LEN]>;

/// Encode `v` big-endian with no leading zero bytes (0 encodes as empty)
pub fn encode_uint(v: u32) -> UintBytes {
    let be = v.to_be_bytes();
    let skip = (v.leading_zeros() / 8) as usize;
    SmallVec::from_slice(&be[skip..])
}

/// Decode a big-endian integer of 0..=4 bytes, left-padding with zeros.
///
/// Returns `None` when `b` is longer than 4 bytes.
pub fn decode_uint(b: &[u8]) -> Option<u32> {
    if b.len() > MAX_UINT_LEN {
        return None;
    }
    let mut tmp = [0u8; MAX_UINT_LEN];
    tmp[MAX_UINT_LEN - b.len()..].copy_from_slice(b);
    Some(u32::from_be_bytes(tmp))
}

/// Wire length `encode_uint(v)` would produce
pub fn uint_len(v: u32) -> usize {
    MAX_UINT_LEN - (v.leading_zeros() / 8) as usize
}
