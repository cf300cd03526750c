//! Wire envelope, inbound event kinds and the tag decode table

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while turning raw frames into envelopes and back
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown request type: {0}")]
    UnknownRequest(String),
}

/// The `{type, payload}` structure exchanged in both directions.
///
/// A missing `payload` field decodes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(tag: impl Into<String>, payload: Value) -> Self {
        Self {
            tag: tag.into(),
            payload,
        }
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Kind of an event travelling from the network to the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Raised locally when the socket opens; never received on the wire.
    ConnectionEstablished,
    Stats,
    Inventory,
    PlayerPosition,
    MapData,
    LoginOptions,
    Npcs,
    MapObjects,
    ChatBroadcast,
    GlobalAnnouncement,
    OpenMetroUi,
    OpenTradeUi,
    Dialog,
    GameOver,
    Message,
    /// Server errors, plus every transport and decode fault raised locally.
    Error,
    Players,
    /// Carries the raw wire tag that matched nothing in the decode table.
    Unknown(String),
}

impl EventKind {
    /// Tag used in logs for the locally raised connection event
    pub const CONNECTION_ESTABLISHED: &'static str = "CONNECTION_ESTABLISHED";

    /// Every kind that can arrive on the wire, paired with its tag.
    pub const WIRE_KINDS: [(&'static str, EventKind); 16] = [
        ("SEND_STATS", EventKind::Stats),
        ("SEND_INVENTORY", EventKind::Inventory),
        ("SEND_PLAYER_POSITION", EventKind::PlayerPosition),
        ("SEND_MAP_DATA", EventKind::MapData),
        ("SEND_LOGIN_OPTIONS", EventKind::LoginOptions),
        ("SEND_NPCS", EventKind::Npcs),
        ("SEND_MAP_OBJECTS", EventKind::MapObjects),
        ("BROADCAST_CHAT_MSG", EventKind::ChatBroadcast),
        ("GLOBAL_ANNOUNCEMENT", EventKind::GlobalAnnouncement),
        ("OPEN_METRO_UI", EventKind::OpenMetroUi),
        ("OPEN_TRADE_UI", EventKind::OpenTradeUi),
        ("DIALOG", EventKind::Dialog),
        ("SEND_GAME_OVER", EventKind::GameOver),
        ("SEND_MESSAGE", EventKind::Message),
        ("SEND_ERROR", EventKind::Error),
        ("BROADCAST_PLAYERS", EventKind::Players),
    ];

    /// Wire tag for this kind. Unknown kinds echo the tag they arrived with.
    pub fn tag(&self) -> &str {
        match self {
            EventKind::Unknown(raw) => return raw,
            EventKind::ConnectionEstablished => return Self::CONNECTION_ESTABLISHED,
            _ => {}
        }
        Self::WIRE_KINDS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(tag, _)| *tag)
            .unwrap_or("UNKNOWN")
    }

    /// Game over is the only server message defined without a payload.
    pub fn requires_payload(&self) -> bool {
        !matches!(self, EventKind::GameOver | EventKind::ConnectionEstablished)
    }
}

/// Immutable `{kind, payload}` pair moved through the inbound queue
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    kind: EventKind,
    payload: Value,
}

impl Event {
    pub fn new(kind: EventKind, payload: Value) -> Self {
        Self { kind, payload }
    }

    pub fn connection_established() -> Self {
        Self::new(EventKind::ConnectionEstablished, Value::Null)
    }

    /// Locally raised error carried as a bare string payload, the same shape
    /// the server uses for `SEND_ERROR`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventKind::Error, Value::String(message.into()))
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_parts(self) -> (EventKind, Value) {
        (self.kind, self.payload)
    }
}

/// Lookup from wire tag to event kind, built once at startup
#[derive(Debug, Clone)]
pub struct DecodeTable {
    kinds: HashMap<&'static str, EventKind>,
}

impl DecodeTable {
    pub fn standard() -> Self {
        Self {
            kinds: EventKind::WIRE_KINDS.iter().cloned().collect(),
        }
    }

    pub fn kind_for(&self, tag: &str) -> EventKind {
        self.kinds
            .get(tag)
            .cloned()
            .unwrap_or_else(|| EventKind::Unknown(tag.to_string()))
    }

    /// Parses one text frame into an event
    pub fn decode(&self, text: &str) -> Result<Event, ProtocolError> {
        let envelope = Envelope::decode(text)?;
        Ok(Event::new(self.kind_for(&envelope.tag), envelope.payload))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for DecodeTable {
    fn default() -> Self {
        Self::standard()
    }
}
