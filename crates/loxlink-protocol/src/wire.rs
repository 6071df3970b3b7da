//! Bounds-checked little-endian field readers.
//!
//! Every numeric field on the wire is little-endian. These helpers read a
//! field at an absolute offset and fail with
//! [`ProtocolError::TruncatedBuffer`] instead of panicking on short input.

use crate::error::{ProtocolError, ProtocolResult};

/// Reads `N` bytes starting at `offset`.
pub(crate) fn read_array<const N: usize>(buf: &[u8], offset: usize) -> ProtocolResult<[u8; N]> {
    buf.get(offset..)
        .and_then(|rest| rest.get(..N))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| ProtocolError::truncated(buf, offset, N))
}

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> ProtocolResult<u32> {
    read_array(buf, offset).map(u32::from_le_bytes)
}

pub(crate) fn read_i32(buf: &[u8], offset: usize) -> ProtocolResult<i32> {
    read_array(buf, offset).map(i32::from_le_bytes)
}

pub(crate) fn read_f64(buf: &[u8], offset: usize) -> ProtocolResult<f64> {
    read_array(buf, offset).map(f64::from_le_bytes)
}
