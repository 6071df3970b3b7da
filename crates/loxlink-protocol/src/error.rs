//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while decoding wire data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Header slice is not exactly [`HEADER_LEN`](crate::HEADER_LEN) bytes.
    #[error("malformed header: expected 8 bytes, got {len}")]
    MalformedHeader { len: usize },

    /// Not enough bytes left in the buffer for a fixed-size field.
    #[error("truncated buffer: need {needed} bytes at offset {offset}, {available} available")]
    TruncatedBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A record in an event table claims more bytes than the buffer holds.
    #[error(
        "corrupted payload: record at offset {offset} claims {record_len} bytes, buffer is {buffer_len} bytes"
    )]
    CorruptedPayload {
        offset: usize,
        record_len: usize,
        buffer_len: usize,
    },
}

impl ProtocolError {
    /// Creates a truncated buffer error for a read of `needed` bytes at `offset`.
    pub fn truncated(buf: &[u8], offset: usize, needed: usize) -> Self {
        Self::TruncatedBuffer {
            offset,
            needed,
            available: buf.len().saturating_sub(offset),
        }
    }
}
