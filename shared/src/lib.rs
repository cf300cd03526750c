//! Wire protocol shared between the game client and its tests.
//!
//! The server speaks JSON text frames shaped as `{"type": ..., "payload": ...}`.
//! This crate owns that envelope, the closed set of inbound event kinds, the
//! outbound request builders and the lenient DTO readers used to pull typed
//! data out of loosely-typed payloads.

pub mod dto;
pub mod protocol;
pub mod requests;

pub use dto::{
    DialogInfo, Item, LoginOptions, MapData, MapInfo, MapObject, MetroUi, Npc, OtherPlayer,
    Station, TradeUi,
};
pub use protocol::{DecodeTable, Envelope, Event, EventKind, ProtocolError};
pub use requests::{Direction, Request, RequestKind};

/// Default server endpoint used when none is supplied on the command line.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8080/game";

/// Rolling log capacities, oldest entry evicted first.
pub const CHAT_HISTORY_LIMIT: usize = 10;
pub const GAME_LOG_LIMIT: usize = 8;
pub const NETWORK_LOG_LIMIT: usize = 8;

/// Upper bound on tracked world entities (other players, NPCs, map objects).
pub const MAX_TRACKED_ENTITIES: usize = 256;

/// Payload previews in the network trace are cut to this many characters.
pub const TRACE_PAYLOAD_PREVIEW: usize = 60;

/// Entries in the in-game menu: resume, help, exit.
pub const MENU_ENTRIES: usize = 3;
