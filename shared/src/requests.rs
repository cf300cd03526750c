//! Outbound requests from client to server
//!
//! Every request is a `{kind, payload}` pair produced by one builder per kind,
//! so the payload shape for a given `type` is fixed in exactly one place.

use crate::protocol::{Envelope, ProtocolError};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Init,
    Login,
    Move,
    Chat,
    Attack,
    Interact,
    Use,
    Equip,
    Drop,
    Buy,
    Sell,
    Travel,
    PayDebt,
}

impl RequestKind {
    pub const ALL: [RequestKind; 13] = [
        RequestKind::Init,
        RequestKind::Login,
        RequestKind::Move,
        RequestKind::Chat,
        RequestKind::Attack,
        RequestKind::Interact,
        RequestKind::Use,
        RequestKind::Equip,
        RequestKind::Drop,
        RequestKind::Buy,
        RequestKind::Sell,
        RequestKind::Travel,
        RequestKind::PayDebt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Init => "INIT",
            RequestKind::Login => "LOGIN",
            RequestKind::Move => "MOVE",
            RequestKind::Chat => "CHAT",
            RequestKind::Attack => "ATTACK",
            RequestKind::Interact => "INTERACT",
            RequestKind::Use => "USE",
            RequestKind::Equip => "EQUIP",
            RequestKind::Drop => "DROP",
            RequestKind::Buy => "BUY",
            RequestKind::Sell => "SELL",
            RequestKind::Travel => "TRAVEL",
            RequestKind::PayDebt => "PAY_DEBT",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }
}

/// Movement direction as the server expects it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    kind: RequestKind,
    payload: Value,
}

impl Request {
    fn new(kind: RequestKind, payload: Value) -> Self {
        Self { kind, payload }
    }

    /// Handshake sent as soon as the socket opens
    pub fn init() -> Self {
        Self::new(RequestKind::Init, Value::Null)
    }

    pub fn login(username: &str, player_class: &str, starting_map_id: &str) -> Self {
        Self::new(
            RequestKind::Login,
            json!({
                "username": username,
                "playerClass": player_class,
                "startingMapId": starting_map_id,
            }),
        )
    }

    pub fn movement(direction: Direction) -> Self {
        Self::new(
            RequestKind::Move,
            json!({ "direction": direction.as_str() }),
        )
    }

    pub fn chat(message: &str) -> Self {
        Self::new(RequestKind::Chat, json!({ "message": message }))
    }

    pub fn attack() -> Self {
        Self::new(RequestKind::Attack, json!({}))
    }

    pub fn interact() -> Self {
        Self::new(RequestKind::Interact, json!({}))
    }

    pub fn use_item(slot_index: i32) -> Self {
        Self::new(RequestKind::Use, json!({ "slotIndex": slot_index }))
    }

    pub fn equip(slot_index: i32) -> Self {
        Self::new(RequestKind::Equip, json!({ "slotIndex": slot_index }))
    }

    pub fn drop_item(slot_index: i32, amount: i32) -> Self {
        Self::new(
            RequestKind::Drop,
            json!({ "slotIndex": slot_index, "amount": amount }),
        )
    }

    pub fn buy(npc_id: &str, item_index: usize) -> Self {
        Self::new(
            RequestKind::Buy,
            json!({ "npcId": npc_id, "itemIndex": item_index }),
        )
    }

    pub fn sell(npc_id: &str, slot_index: i32) -> Self {
        Self::new(
            RequestKind::Sell,
            json!({ "npcId": npc_id, "slotIndex": slot_index }),
        )
    }

    pub fn travel(map_id: &str, line_id: &str) -> Self {
        Self::new(
            RequestKind::Travel,
            json!({ "mapId": map_id, "lineId": line_id }),
        )
    }

    pub fn pay_debt(amount: i64) -> Self {
        Self::new(RequestKind::PayDebt, json!({ "amount": amount }))
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn to_envelope(&self) -> Envelope {
        Envelope::new(self.kind.as_str(), self.payload.clone())
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        self.to_envelope().encode()
    }

    /// Parses a frame back into a request; used by tests and tooling that
    /// inspect what the client put on the wire.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope = Envelope::decode(text)?;
        let kind = RequestKind::from_tag(&envelope.tag)
            .ok_or_else(|| ProtocolError::UnknownRequest(envelope.tag.clone()))?;
        Ok(Self::new(kind, envelope.payload))
    }
}
