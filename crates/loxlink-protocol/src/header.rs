//! Binary message header and next-state derivation.
//!
//! Every payload the device sends is announced by an 8-byte binary header:
//!
//! ```text
//! +------------+------------+------+----------+------------------------+
//! | frame_kind | identifier | info | reserved | payload_length (u32 LE) |
//! +------------+------------+------+----------+------------------------+
//!       0            1         2        3               4..8
//! ```
//!
//! The identifier selects how the next message is decoded. Bit 7 of `info`
//! marks a header that is not followed by a payload at all.

use std::fmt;

use serde::Serialize;

use crate::HEADER_LEN;
use crate::error::{ProtocolError, ProtocolResult};

/// Bit in [`Header::info`] set when no payload follows the header.
pub const INFO_NO_PAYLOAD: u8 = 0x80;

/// What the next delivered message is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    /// An 8-byte binary header.
    #[default]
    AwaitingHeader,
    /// A text message.
    Text,
    /// A binary (or text) file.
    BinaryFile,
    /// A table of value events.
    EventValues,
    /// A table of text events.
    EventText,
    /// A table of daytimer events.
    EventDaytimer,
    /// A table of weather events.
    EventWeather,
}

impl MessageState {
    /// Returns true for the four event-table states.
    pub fn is_event_table(self) -> bool {
        matches!(
            self,
            Self::EventValues | Self::EventText | Self::EventDaytimer | Self::EventWeather
        )
    }
}

impl fmt::Display for MessageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingHeader => "awaiting_header",
            Self::Text => "text",
            Self::BinaryFile => "binary_file",
            Self::EventValues => "event_values",
            Self::EventText => "event_text",
            Self::EventDaytimer => "event_daytimer",
            Self::EventWeather => "event_weather",
        };
        f.write_str(name)
    }
}

/// Known header identifiers.
///
/// This table is the wire contract; it is closed and unversioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Identifier {
    Text = 0,
    BinaryFile = 1,
    EventValues = 2,
    EventText = 3,
    EventDaytimer = 4,
    /// The device is going out of service; used as the final-response marker.
    OutOfService = 5,
    /// Answer to a `keepalive` probe.
    KeepaliveAck = 6,
    EventWeather = 7,
}

impl Identifier {
    /// State the machine moves to after a payload-bearing header with this identifier.
    pub fn next_state(self) -> MessageState {
        match self {
            Self::Text => MessageState::Text,
            Self::BinaryFile => MessageState::BinaryFile,
            Self::EventValues => MessageState::EventValues,
            Self::EventText => MessageState::EventText,
            Self::EventDaytimer => MessageState::EventDaytimer,
            Self::OutOfService | Self::KeepaliveAck => MessageState::AwaitingHeader,
            Self::EventWeather => MessageState::EventWeather,
        }
    }
}

impl TryFrom<u8> for Identifier {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Text,
            1 => Self::BinaryFile,
            2 => Self::EventValues,
            3 => Self::EventText,
            4 => Self::EventDaytimer,
            5 => Self::OutOfService,
            6 => Self::KeepaliveAck,
            7 => Self::EventWeather,
            other => return Err(other),
        })
    }
}

/// A decoded message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Header {
    /// Frame kind byte (always `0x03` for binary headers in practice).
    pub frame_kind: u8,
    /// Raw identifier; see [`Identifier`].
    pub identifier: u8,
    /// Flag byte; bit 7 is [`INFO_NO_PAYLOAD`].
    pub info: u8,
    /// Reserved byte, kept for re-encoding.
    pub reserved: u8,
    /// Declared length of the payload that follows.
    pub payload_length: u32,
}

impl Header {
    /// Decodes a header from exactly [`HEADER_LEN`] bytes.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        let raw: &[u8; HEADER_LEN] = bytes
            .try_into()
            .map_err(|_| ProtocolError::MalformedHeader { len: bytes.len() })?;

        Ok(Self {
            frame_kind: raw[0],
            identifier: raw[1],
            info: raw[2],
            reserved: raw[3],
            payload_length: u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]),
        })
    }

    /// Encodes the header back into its wire form.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let len = self.payload_length.to_le_bytes();
        [
            self.frame_kind,
            self.identifier,
            self.info,
            self.reserved,
            len[0],
            len[1],
            len[2],
            len[3],
        ]
    }

    /// Returns the identifier if it is one of the known values.
    pub fn kind(&self) -> Option<Identifier> {
        Identifier::try_from(self.identifier).ok()
    }

    /// Returns true if the `info` flag says no payload follows.
    pub fn no_payload(&self) -> bool {
        self.info & INFO_NO_PAYLOAD != 0
    }

    /// Returns true if this header acknowledges a keepalive probe.
    pub fn is_keepalive_ack(&self) -> bool {
        self.kind() == Some(Identifier::KeepaliveAck)
    }

    /// Returns true if this header announces the device going out of service.
    pub fn is_out_of_service(&self) -> bool {
        self.kind() == Some(Identifier::OutOfService)
    }

    /// Derives the state for the next message.
    ///
    /// Depends only on `identifier` and bit 7 of `info`. Unknown identifiers
    /// fall back to [`MessageState::AwaitingHeader`].
    pub fn next_state(&self) -> MessageState {
        if self.no_payload() {
            return MessageState::AwaitingHeader;
        }
        self.kind()
            .map_or(MessageState::AwaitingHeader, Identifier::next_state)
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "header kind={:#04x} id={} info={:#04x} len={} next={}",
            self.frame_kind,
            self.identifier,
            self.info,
            self.payload_length,
            self.next_state()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(identifier: u8, info: u8, len: u32) -> Header {
        Header {
            frame_kind: 0x03,
            identifier,
            info,
            reserved: 0,
            payload_length: len,
        }
    }

    #[test]
    fn decode_fields() {
        let bytes = [0x03, 0x02, 0x00, 0x00, 0x48, 0x00, 0x01, 0x00];
        let header = Header::decode(&bytes).unwrap();

        assert_eq!(header.frame_kind, 0x03);
        assert_eq!(header.identifier, 2);
        assert_eq!(header.info, 0);
        assert_eq!(header.payload_length, 0x0001_0048);
        assert_eq!(header.encode(), bytes);
    }

    #[test]
    fn decode_rejects_wrong_length() {
        assert_eq!(
            Header::decode(&[0x03; 7]),
            Err(ProtocolError::MalformedHeader { len: 7 })
        );
        assert_eq!(
            Header::decode(&[0x03; 9]),
            Err(ProtocolError::MalformedHeader { len: 9 })
        );
        assert_eq!(
            Header::decode(&[]),
            Err(ProtocolError::MalformedHeader { len: 0 })
        );
    }

    #[test]
    fn identifier_table() {
        let expected = [
            (0, MessageState::Text),
            (1, MessageState::BinaryFile),
            (2, MessageState::EventValues),
            (3, MessageState::EventText),
            (4, MessageState::EventDaytimer),
            (5, MessageState::AwaitingHeader),
            (6, MessageState::AwaitingHeader),
            (7, MessageState::EventWeather),
        ];

        for (identifier, state) in expected {
            assert_eq!(header(identifier, 0, 0).next_state(), state, "id {identifier}");
        }
    }

    #[test]
    fn unknown_identifier_awaits_header() {
        for identifier in [8, 9, 0x42, 0xff] {
            let header = header(identifier, 0, 12);
            assert_eq!(header.kind(), None);
            assert_eq!(header.next_state(), MessageState::AwaitingHeader);
        }
    }

    #[test]
    fn no_payload_flag_wins_over_identifier() {
        for identifier in 0..=7 {
            let header = header(identifier, INFO_NO_PAYLOAD, 0);
            assert!(header.no_payload());
            assert_eq!(header.next_state(), MessageState::AwaitingHeader);
        }
        // Other info bits do not matter.
        assert_eq!(header(2, 0x7f, 0).next_state(), MessageState::EventValues);
    }

    #[test]
    fn next_state_is_deterministic() {
        let bytes = [0x03, 0x03, 0x01, 0x00, 0x10, 0x00, 0x00, 0x00];
        let first = Header::decode(&bytes).unwrap();
        for _ in 0..4 {
            let again = Header::decode(&bytes).unwrap();
            assert_eq!(again, first);
            assert_eq!(again.next_state(), first.next_state());
        }
        assert_eq!(first.next_state(), MessageState::EventText);
    }

    #[test]
    fn keepalive_and_out_of_service() {
        assert!(header(6, 0, 0).is_keepalive_ack());
        assert!(!header(6, 0, 0).is_out_of_service());
        assert!(header(5, 0, 0).is_out_of_service());
        assert!(!header(2, 0, 0).is_keepalive_ack());
    }

    #[test]
    fn display() {
        insta::assert_snapshot!(
            header(2, 0, 72).to_string(),
            @"header kind=0x03 id=2 info=0x00 len=72 next=event_values"
        );
    }

    #[test]
    fn event_table_states() {
        assert!(MessageState::EventWeather.is_event_table());
        assert!(!MessageState::BinaryFile.is_event_table());
        assert_eq!(MessageState::default(), MessageState::AwaitingHeader);
    }
}
