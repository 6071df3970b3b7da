//! Mixed-endian UUID decoding.
//!
//! The device sends UUIDs in the GUID wire layout: the first three fields
//! are little-endian, the trailing eight bytes are copied as they appear.
//!
//! ```text
//! bytes:  00 11 22 33 | 44 55 | 66 77 | 88 99 aa bb cc dd ee ff
//! string: 33221100    - 5544  - 7766  - 8899aabbccddeeff
//! ```

use std::fmt;

use serde::Serialize;

use crate::UUID_LEN;
use crate::error::ProtocolResult;
use crate::records::Record;
use crate::wire::read_array;

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Byte positions in the order their hex digits appear in the string,
/// with `None` marking a group separator.
const LAYOUT: [Option<usize>; 19] = [
    Some(3),
    Some(2),
    Some(1),
    Some(0),
    None,
    Some(5),
    Some(4),
    None,
    Some(7),
    Some(6),
    None,
    Some(8),
    Some(9),
    Some(10),
    Some(11),
    Some(12),
    Some(13),
    Some(14),
    Some(15),
];

/// A control or icon identifier in canonical lower-case form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Uuid(String);

impl Uuid {
    /// Decodes the 16 bytes starting at `offset`.
    pub fn decode(buf: &[u8], offset: usize) -> ProtocolResult<Self> {
        let raw: [u8; UUID_LEN] = read_array(buf, offset)?;
        Ok(Self::from_wire(&raw))
    }

    /// Converts raw wire bytes into the canonical string.
    pub fn from_wire(raw: &[u8; UUID_LEN]) -> Self {
        let mut out = String::with_capacity(UUID_LEN * 2 + 3);
        for slot in LAYOUT {
            match slot {
                Some(i) => {
                    out.push(HEX[usize::from(raw[i] >> 4)] as char);
                    out.push(HEX[usize::from(raw[i] & 0x0f)] as char);
                }
                None => out.push('-'),
            }
        }
        Self(out)
    }

    /// Returns the canonical string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Record for Uuid {
    fn decode(buf: &[u8], offset: usize) -> ProtocolResult<Self> {
        Uuid::decode(buf, offset)
    }

    fn data_length(&self) -> usize {
        UUID_LEN
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Uuid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
