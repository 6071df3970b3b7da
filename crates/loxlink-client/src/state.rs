//! Message framing state machine.
//!
//! The device sends every payload as a header/payload pair. The machine
//! remembers which payload the last header announced and decodes the next
//! message accordingly.
//!
//! # State Machine
//!
//! ```text
//!                  header (binary, 8 bytes)
//!   ┌────────────────┐ ───────────────────────> ┌──────────────────────┐
//!   │ AwaitingHeader │                          │ Text / BinaryFile /  │
//!   │                │ <─────────────────────── │ Event{Values,Text,   │
//!   └────────────────┘   any decoded payload    │ Daytimer,Weather}    │
//!        │     ^                                └──────────────────────┘
//!        └─────┘ header with info bit 7, id 5/6, or unknown id
//! ```
//!
//! A message with the wrong frame kind is reported as invalid and leaves
//! the state untouched, so the correctly framed payload can still follow.
//! Every decoded payload, corrupted or not, returns the machine to
//! `AwaitingHeader`, so one payload always pairs with one header.

use loxlink_protocol::{
    DaytimerEvent, FileMessage, Header, Message, MessageState, Record, TextEvent, TextMessage,
    ValueEvent, WeatherEvent, decode_table,
};
use tracing::{debug, trace, warn};

use crate::event::ConnectionEvent;

/// Header/payload state for one connection.
#[derive(Debug, Clone, Default)]
pub struct MessageStateMachine {
    expected: MessageState,
    last_header: Option<Header>,
    last_request: Option<String>,
}

impl MessageStateMachine {
    /// Creates a machine waiting for a header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kind of message expected next.
    pub fn expected(&self) -> MessageState {
        self.expected
    }

    /// Returns the most recently decoded header.
    pub fn last_header(&self) -> Option<&Header> {
        self.last_header.as_ref()
    }

    /// Returns the most recent outgoing request.
    pub fn last_request(&self) -> Option<&str> {
        self.last_request.as_deref()
    }

    /// Remembers an outgoing request; file payloads are attributed to it.
    pub fn record_request(&mut self, request: impl Into<String>) {
        self.last_request = Some(request.into());
    }

    /// Returns to the initial state, forgetting the last header and request.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Consumes one message and returns the event it produces.
    pub fn handle(&mut self, message: Message) -> ConnectionEvent {
        let state = self.expected;
        trace!(state = %state, len = message.len(), "handling message");

        match (state, message) {
            (MessageState::AwaitingHeader, Message::Binary(data)) => self.on_header(&data),
            (MessageState::Text, Message::Text(text)) => {
                self.expected = MessageState::AwaitingHeader;
                ConnectionEvent::Text(TextMessage::parse(text))
            }
            (MessageState::BinaryFile, payload) => {
                self.expected = MessageState::AwaitingHeader;
                ConnectionEvent::File(FileMessage::new(payload, self.last_request.clone()))
            }
            (MessageState::EventValues, Message::Binary(data)) => {
                self.on_table::<ValueEvent>(&data, ConnectionEvent::ValueTable)
            }
            (MessageState::EventText, Message::Binary(data)) => {
                self.on_table::<TextEvent>(&data, ConnectionEvent::TextTable)
            }
            (MessageState::EventDaytimer, Message::Binary(data)) => {
                self.on_table::<DaytimerEvent>(&data, ConnectionEvent::DaytimerTable)
            }
            (MessageState::EventWeather, Message::Binary(data)) => {
                self.on_table::<WeatherEvent>(&data, ConnectionEvent::WeatherTable)
            }
            (expected, message) => {
                warn!(
                    expected = %expected,
                    frame = ?message.frame_kind(),
                    "message has wrong frame kind for current state"
                );
                ConnectionEvent::Invalid { expected, message }
            }
        }
    }

    fn on_header(&mut self, data: &[u8]) -> ConnectionEvent {
        match Header::decode(data) {
            Ok(header) => {
                self.expected = header.next_state();
                self.last_header = Some(header);
                debug!(
                    identifier = header.identifier,
                    info = header.info,
                    payload_length = header.payload_length,
                    next = %self.expected,
                    "decoded header"
                );
                ConnectionEvent::Header(header)
            }
            Err(error) => {
                warn!(error = %error, "dropping malformed header");
                ConnectionEvent::CorruptedPayload {
                    state: MessageState::AwaitingHeader,
                    error,
                }
            }
        }
    }

    fn on_table<R: Record>(
        &mut self,
        data: &[u8],
        wrap: fn(Vec<R>) -> ConnectionEvent,
    ) -> ConnectionEvent {
        let state = std::mem::take(&mut self.expected);
        match decode_table::<R>(data) {
            Ok(records) => {
                debug!(state = %state, records = records.len(), "decoded event table");
                wrap(records)
            }
            Err(error) => {
                warn!(state = %state, error = %error, "discarding corrupted event table");
                ConnectionEvent::CorruptedPayload { state, error }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loxlink_protocol::{INFO_NO_PAYLOAD, ProtocolError};

    fn header(identifier: u8, info: u8, len: u32) -> Message {
        Message::Binary(
            Header {
                frame_kind: 0x03,
                identifier,
                info,
                reserved: 0,
                payload_length: len,
            }
            .encode()
            .to_vec(),
        )
    }

    fn value_record(seed: u8, value: f64) -> Vec<u8> {
        let mut buf = vec![seed; 16];
        buf.extend_from_slice(&value.to_le_bytes());
        buf
    }

    #[test]
    fn header_then_value_table() {
        let mut machine = MessageStateMachine::new();

        let event = machine.handle(header(2, 0, 72));
        assert!(matches!(event, ConnectionEvent::Header(h) if h.identifier == 2));
        assert_eq!(machine.expected(), MessageState::EventValues);

        let payload = [
            value_record(1, 1.0),
            value_record(2, 0.5),
            value_record(3, -4.0),
        ]
        .concat();
        let event = machine.handle(Message::Binary(payload));

        let ConnectionEvent::ValueTable(table) = event else {
            panic!("expected value table, got {event:?}");
        };
        assert_eq!(
            table.iter().map(|e| e.value).collect::<Vec<_>>(),
            vec![1.0, 0.5, -4.0]
        );
        assert_eq!(machine.expected(), MessageState::AwaitingHeader);
    }

    #[test]
    fn text_while_header_expected_is_invalid() {
        let mut machine = MessageStateMachine::new();
        let event = machine.handle(Message::Text("stray".into()));
        assert_eq!(
            event,
            ConnectionEvent::Invalid {
                expected: MessageState::AwaitingHeader,
                message: Message::Text("stray".into()),
            }
        );
        assert_eq!(machine.expected(), MessageState::AwaitingHeader);
    }

    #[test]
    fn text_while_event_text_expected_keeps_state() {
        let mut machine = MessageStateMachine::new();
        machine.handle(header(3, 0, 40));
        assert_eq!(machine.expected(), MessageState::EventText);

        let event = machine.handle(Message::Text("not a table".into()));
        assert!(matches!(
            event,
            ConnectionEvent::Invalid {
                expected: MessageState::EventText,
                ..
            }
        ));
        assert_eq!(machine.expected(), MessageState::EventText);

        // The real payload still decodes afterwards.
        let event = machine.handle(Message::Binary(Vec::new()));
        assert_eq!(event, ConnectionEvent::TextTable(Vec::new()));
        assert_eq!(machine.expected(), MessageState::AwaitingHeader);
    }

    #[test]
    fn binary_while_text_expected_is_invalid() {
        let mut machine = MessageStateMachine::new();
        machine.handle(header(0, 0, 10));
        let event = machine.handle(Message::Binary(vec![1, 2, 3]));
        assert!(matches!(event, ConnectionEvent::Invalid { .. }));
        assert_eq!(machine.expected(), MessageState::Text);

        let event = machine.handle(Message::Text(
            r#"{"LL":{"control":"jdev/cfg/api","value":"ok","Code":"200"}}"#.into(),
        ));
        let ConnectionEvent::Text(text) = event else {
            panic!("expected text");
        };
        assert_eq!(text.reply.unwrap().control, "jdev/cfg/api");
        assert_eq!(machine.expected(), MessageState::AwaitingHeader);
    }

    #[test]
    fn file_accepts_either_frame_and_carries_request() {
        let mut machine = MessageStateMachine::new();
        machine.record_request("data/LoxAPP3.json");

        machine.handle(header(1, 0, 2));
        let event = machine.handle(Message::Text("{}".into()));
        assert_eq!(
            event,
            ConnectionEvent::File(FileMessage::new(
                Message::Text("{}".into()),
                Some("data/LoxAPP3.json".into())
            ))
        );
        assert_eq!(machine.expected(), MessageState::AwaitingHeader);

        machine.handle(header(1, 0, 2));
        let event = machine.handle(Message::Binary(vec![0xff, 0xd8]));
        assert!(matches!(event, ConnectionEvent::File(_)));
        assert_eq!(machine.expected(), MessageState::AwaitingHeader);
    }

    #[test]
    fn no_payload_header_stays_awaiting_header() {
        let mut machine = MessageStateMachine::new();
        machine.handle(header(2, INFO_NO_PAYLOAD, 0));
        assert_eq!(machine.expected(), MessageState::AwaitingHeader);
        assert_eq!(machine.last_header().map(|h| h.identifier), Some(2));
    }

    #[test]
    fn keepalive_and_out_of_service_headers_have_no_payload() {
        let mut machine = MessageStateMachine::new();
        machine.handle(header(6, 0, 0));
        assert_eq!(machine.expected(), MessageState::AwaitingHeader);
        machine.handle(header(5, 0, 0));
        assert_eq!(machine.expected(), MessageState::AwaitingHeader);
        assert!(machine.last_header().unwrap().is_out_of_service());
    }

    #[test]
    fn malformed_header_is_reported() {
        let mut machine = MessageStateMachine::new();
        let event = machine.handle(Message::Binary(vec![0x03, 0x02, 0x00]));
        assert_eq!(
            event,
            ConnectionEvent::CorruptedPayload {
                state: MessageState::AwaitingHeader,
                error: ProtocolError::MalformedHeader { len: 3 },
            }
        );
        assert_eq!(machine.expected(), MessageState::AwaitingHeader);
        assert!(machine.last_header().is_none());
    }

    #[test]
    fn corrupted_table_is_discarded_and_state_resets() {
        let mut machine = MessageStateMachine::new();
        machine.handle(header(2, 0, 40));

        let mut payload = value_record(1, 1.0);
        payload.extend_from_slice(&[0u8; 16]);
        let event = machine.handle(Message::Binary(payload));

        assert!(matches!(
            event,
            ConnectionEvent::CorruptedPayload {
                state: MessageState::EventValues,
                error: ProtocolError::CorruptedPayload { offset: 24, .. },
            }
        ));
        assert_eq!(machine.expected(), MessageState::AwaitingHeader);
    }

    #[test]
    fn every_table_state_returns_to_header() {
        for identifier in [2, 3, 4, 7] {
            let mut machine = MessageStateMachine::new();
            machine.handle(header(identifier, 0, 0));
            assert!(machine.expected().is_event_table());
            machine.handle(Message::Binary(Vec::new()));
            assert_eq!(machine.expected(), MessageState::AwaitingHeader);
        }
    }

    #[test]
    fn same_message_same_outcome() {
        let payload = [value_record(9, 3.0), value_record(8, 4.0)].concat();

        let mut first = MessageStateMachine::new();
        first.handle(header(2, 0, 48));
        let a = first.handle(Message::Binary(payload.clone()));

        let mut second = MessageStateMachine::new();
        second.handle(header(2, 0, 48));
        let b = second.handle(Message::Binary(payload));

        assert_eq!(a, b);
        assert_eq!(first.expected(), second.expected());
    }

    #[test]
    fn reset_clears_state() {
        let mut machine = MessageStateMachine::new();
        machine.record_request("jdev/sps/enablebinstatusupdate");
        machine.handle(header(7, 0, 24));
        machine.reset();
        assert_eq!(machine.expected(), MessageState::AwaitingHeader);
        assert!(machine.last_header().is_none());
        assert!(machine.last_request().is_none());
    }
}
