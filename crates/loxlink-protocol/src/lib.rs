//! Wire decoders for the `remotecontrol` WebSocket protocol.
//!
//! The device answers every request, and pushes every state change, as a
//! pair of messages: an 8-byte binary [`Header`] followed by the payload it
//! announces. This crate decodes both halves and knows nothing about
//! sockets or timers.
//!
//! # Decoding overview
//!
//! - [`Header::decode`] reads the 8-byte header and [`Header::next_state`]
//!   says what the following message is.
//! - [`Uuid::decode`] reads the mixed-endian 16-byte identifiers embedded in
//!   event records.
//! - [`decode_table`] walks an event-table payload record by record using
//!   each [`Record`]'s self-reported length.
//!
//! # Example
//!
//! ```rust
//! use loxlink_protocol::{Header, MessageState, ValueEvent, decode_table};
//!
//! let header = Header::decode(&[0x03, 0x02, 0x00, 0x00, 0x18, 0x00, 0x00, 0x00]).unwrap();
//! assert_eq!(header.next_state(), MessageState::EventValues);
//!
//! let mut payload = vec![0u8; 16];
//! payload.extend_from_slice(&1.0f64.to_le_bytes());
//! let table: Vec<ValueEvent> = decode_table(&payload).unwrap();
//! assert_eq!(table[0].value, 1.0);
//! ```

pub mod command;
mod error;
mod header;
mod message;
mod records;
mod uuid;
mod wire;

pub use error::{ProtocolError, ProtocolResult};
pub use header::{Header, INFO_NO_PAYLOAD, Identifier, MessageState};
pub use message::{FileMessage, FrameKind, Message, Reply, TextMessage};
pub use records::{
    DEVICE_EPOCH, DaytimerEntry, DaytimerEvent, Record, TextEvent, ValueEvent, WeatherEntry,
    WeatherEvent, decode_table,
};
pub use uuid::Uuid;

/// Size of a binary message header.
pub const HEADER_LEN: usize = 8;

/// Size of a UUID on the wire.
pub const UUID_LEN: usize = 16;

/// Text sent as a keepalive probe.
pub const KEEPALIVE_PROBE: &str = "keepalive";

/// WebSocket sub-protocol negotiated during the handshake.
pub const WS_PROTOCOL: &str = "remotecontrol";

/// Path of the WebSocket endpoint on the device.
pub const WS_PATH: &str = "/ws/rfc6455";
