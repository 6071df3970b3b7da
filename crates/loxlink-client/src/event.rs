//! Events emitted by a connection.

use std::time::Duration;

use loxlink_protocol::{
    DaytimerEvent, FileMessage, Header, Message, MessageState, ProtocolError, TextEvent,
    TextMessage, ValueEvent, WeatherEvent,
};

/// Everything a connection reports to its owner, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The WebSocket handshake succeeded and the session is registered.
    Connected,
    /// The link is gone, or was declared stale.
    Closed {
        /// True when the last header seen announced the device going out of service.
        graceful: bool,
        reason: String,
    },
    /// The handshake failed.
    ConnectFailed { reason: String },
    /// The transport failed mid-connection.
    ConnectionError { reason: String },
    /// A message was handed to the transport.
    Sent(String),
    /// A binary header was decoded.
    Header(Header),
    Text(TextMessage),
    File(FileMessage),
    ValueTable(Vec<ValueEvent>),
    TextTable(Vec<TextEvent>),
    DaytimerTable(Vec<DaytimerEvent>),
    WeatherTable(Vec<WeatherEvent>),
    /// A message arrived with the wrong frame kind for the current state.
    Invalid {
        expected: MessageState,
        message: Message,
    },
    /// A header or event-table payload could not be decoded.
    CorruptedPayload {
        state: MessageState,
        error: ProtocolError,
    },
    /// A keepalive acknowledgment arrived; carries the probe round-trip time.
    Keepalive(Duration),
}

impl ConnectionEvent {
    /// Returns true for events after which the connection task has ended
    /// or the link should be considered dead.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Closed { .. } | Self::ConnectFailed { .. } | Self::ConnectionError { .. }
        )
    }

    /// Short snake_case name, used as the `event` field in logs and output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected => "connect",
            Self::Closed { .. } => "close",
            Self::ConnectFailed { .. } => "connect_failed",
            Self::ConnectionError { .. } => "connection_error",
            Self::Sent(_) => "send",
            Self::Header(_) => "message_header",
            Self::Text(_) => "message_text",
            Self::File(_) => "message_file",
            Self::ValueTable(_) => "message_event_table_values",
            Self::TextTable(_) => "message_event_table_text",
            Self::DaytimerTable(_) => "message_event_table_daytimer",
            Self::WeatherTable(_) => "message_event_table_weather",
            Self::Invalid { .. } => "message_invalid",
            Self::CorruptedPayload { .. } => "message_corrupted",
            Self::Keepalive(_) => "keepalive",
        }
    }
}
