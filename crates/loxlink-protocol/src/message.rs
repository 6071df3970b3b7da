//! Transport messages and pass-through payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a delivered message was binary or text framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Binary,
    Text,
}

/// One whole message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Binary(Vec<u8>),
    Text(String),
}

impl Message {
    /// Returns the frame kind of this message.
    pub fn frame_kind(&self) -> FrameKind {
        match self {
            Self::Binary(_) => FrameKind::Binary,
            Self::Text(_) => FrameKind::Text,
        }
    }

    /// Returns the payload size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(data) => data.len(),
            Self::Text(text) => text.len(),
        }
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A text payload, with the command reply extracted when it has one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextMessage {
    pub raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<Reply>,
}

impl TextMessage {
    /// Wraps a text payload, parsing the `{"LL": {...}}` reply envelope if present.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let reply = serde_json::from_str::<ReplyEnvelope>(&raw)
            .ok()
            .map(|envelope| envelope.ll.into());
        Self { raw, reply }
    }
}

/// Reply to a command sent over the link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    /// The command this reply belongs to.
    pub control: String,
    /// HTTP-like status code (200 on success).
    pub code: Option<u16>,
    pub value: Value,
}

impl Reply {
    /// Returns true for a 200 status.
    pub fn is_success(&self) -> bool {
        self.code == Some(200)
    }
}

#[derive(Deserialize)]
struct ReplyEnvelope {
    #[serde(rename = "LL")]
    ll: RawReply,
}

#[derive(Deserialize)]
struct RawReply {
    #[serde(default)]
    control: String,
    #[serde(default, alias = "Code")]
    code: Value,
    #[serde(default)]
    value: Value,
}

impl From<RawReply> for Reply {
    fn from(raw: RawReply) -> Self {
        let code = match &raw.code {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        Self {
            control: raw.control,
            code,
            value: raw.value,
        }
    }
}

/// A file payload together with the request that most likely asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMessage {
    pub payload: Message,
    pub request: Option<String>,
}

impl FileMessage {
    pub fn new(payload: Message, request: Option<String>) -> Self {
        Self { payload, request }
    }

    /// Returns the file contents as text if it was sent as text or is valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            Message::Text(text) => Some(text),
            Message::Binary(data) => std::str::from_utf8(data).ok(),
        }
    }
}
