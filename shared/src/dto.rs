//! Typed views over server payloads
//!
//! Payloads are read field by field: a missing, `null` or wrongly typed field
//! falls back to a default instead of failing the whole message.

use crate::MAX_TRACKED_ENTITIES;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub fn str_field(value: &Value, key: &str, default: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => default.to_string(),
    }
}

pub fn i64_field(value: &Value, key: &str, default: i64) -> i64 {
    match value.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(default),
        _ => default,
    }
}

pub fn i32_field(value: &Value, key: &str, default: i32) -> i32 {
    let wide = i64_field(value, key, i64::from(default));
    i32::try_from(wide).unwrap_or(default)
}

pub fn bool_field(value: &Value, key: &str, default: bool) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Slot references arrive as numbers, strings or `null` depending on the server build
pub fn slot_field(value: &Value, key: &str, current: &str) -> String {
    match value.get(key) {
        Some(Value::Null) => String::new(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => current.to_string(),
    }
}

fn objects(value: &Value) -> impl Iterator<Item = &Value> {
    value
        .as_array()
        .map(|items| items.as_slice())
        .unwrap_or(&[])
        .iter()
        .filter(|item| !item.is_null())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub description: String,
    pub rarity: String,
    pub quantity: i32,
    pub price: i32,
}

impl Item {
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: str_field(value, "id", ""),
            name: str_field(value, "name", "Unknown"),
            kind: str_field(value, "type", "MISC"),
            description: str_field(value, "description", ""),
            rarity: str_field(value, "rarity", "COMMON"),
            quantity: i32_field(value, "quantity", 1),
            price: i32_field(value, "price", 0),
        }
    }
}

/// Builds the slot map from `{"<slot>": item | null}`; empty slots and
/// non-numeric keys are left out.
pub fn parse_inventory(value: &Value) -> BTreeMap<i32, Item> {
    let mut slots = BTreeMap::new();
    if let Some(entries) = value.as_object() {
        for (key, item) in entries {
            if item.is_null() {
                continue;
            }
            if let Ok(slot) = key.trim().parse::<i32>() {
                slots.insert(slot, Item::from_value(item));
            }
        }
    }
    slots
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapInfo {
    pub map_id: String,
    pub map_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoginOptions {
    pub classes: Vec<String>,
    pub maps: Vec<MapInfo>,
}

impl LoginOptions {
    pub fn from_value(value: &Value) -> Self {
        let classes = value
            .get("classes")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let maps = value
            .get("maps")
            .map(|maps| {
                objects(maps)
                    .map(|m| MapInfo {
                        map_id: str_field(m, "mapId", ""),
                        map_name: str_field(m, "mapName", ""),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { classes, maps }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub map_name: String,
    pub center_x: i32,
    pub center_y: i32,
    pub center_z: i32,
    pub range_x: i32,
    pub range_y: i32,
    pub layers: BTreeMap<String, Vec<String>>,
}

impl MapData {
    /// Accepts both `center{x,y,z}`/`range{x,y}` and the flat
    /// `centerX`/`rangeX` layout older servers send.
    pub fn from_value(value: &Value) -> Self {
        let center = value.get("center").unwrap_or(&Value::Null);
        let range = value.get("range").unwrap_or(&Value::Null);

        let mut layers = BTreeMap::new();
        if let Some(entries) = value.get("layers").and_then(Value::as_object) {
            for (key, rows) in entries {
                if let Some(rows) = rows.as_array() {
                    let rows = rows
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect();
                    layers.insert(key.clone(), rows);
                }
            }
        }

        Self {
            map_name: str_field(value, "mapName", "Unknown Map"),
            center_x: i32_field(center, "x", i32_field(value, "centerX", 0)),
            center_y: i32_field(center, "y", i32_field(value, "centerY", 0)),
            center_z: i32_field(center, "z", i32_field(value, "centerZ", 0)),
            range_x: i32_field(range, "x", i32_field(value, "rangeX", 0)),
            range_y: i32_field(range, "y", i32_field(value, "rangeY", 0)),
            layers,
        }
    }

    pub fn layer(&self, index: i32) -> Option<&Vec<String>> {
        self.layers.get(&index.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Npc {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub aggressive: bool,
    pub interaction: String,
}

impl Npc {
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: str_field(value, "id", ""),
            name: str_field(value, "name", ""),
            kind: str_field(value, "type", ""),
            x: i32_field(value, "x", 0),
            y: i32_field(value, "y", 0),
            z: i32_field(value, "z", 0),
            hp: i32_field(value, "hp", 0),
            max_hp: i32_field(value, "maxHp", 0),
            aggressive: bool_field(value, "aggressive", false),
            interaction: str_field(value, "interaction", "TALK"),
        }
    }

    pub fn list_from_value(value: &Value) -> Vec<Self> {
        objects(value)
            .take(MAX_TRACKED_ENTITIES)
            .map(Self::from_value)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapObject {
    pub id: String,
    pub kind: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub action: String,
    pub description: String,
}

impl MapObject {
    pub fn from_value(value: &Value) -> Self {
        Self {
            id: str_field(value, "id", ""),
            kind: str_field(value, "type", ""),
            x: i32_field(value, "x", 0),
            y: i32_field(value, "y", 0),
            z: i32_field(value, "z", 0),
            action: str_field(value, "action", ""),
            description: str_field(value, "description", ""),
        }
    }

    pub fn list_from_value(value: &Value) -> Vec<Self> {
        objects(value)
            .take(MAX_TRACKED_ENTITIES)
            .map(Self::from_value)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtherPlayer {
    pub id: String,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl OtherPlayer {
    /// Reads the player roster, skipping the entry whose id equals `self_id` exactly
    pub fn list_from_value(value: &Value, self_id: &str) -> Vec<Self> {
        objects(value)
            .filter(|p| str_field(p, "id", "") != self_id)
            .take(MAX_TRACKED_ENTITIES)
            .map(|p| Self {
                id: str_field(p, "id", ""),
                name: str_field(p, "name", "Unknown"),
                x: i32_field(p, "x", 0),
                y: i32_field(p, "y", 0),
                z: i32_field(p, "z", 0),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetroUi {
    pub line_id: String,
    pub stations: Vec<Station>,
}

impl MetroUi {
    pub fn from_value(value: &Value) -> Self {
        let stations = value
            .get("stations")
            .map(|stations| {
                objects(stations)
                    .map(|s| Station {
                        id: str_field(s, "id", ""),
                        name: str_field(s, "name", ""),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            line_id: str_field(value, "lineId", ""),
            stations,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeUi {
    pub npc_id: String,
    pub npc_name: String,
    pub items: Vec<Item>,
    pub welcome_message: String,
}

impl TradeUi {
    pub fn from_value(value: &Value) -> Self {
        let items = value
            .get("items")
            .map(|items| objects(items).map(Item::from_value).collect())
            .unwrap_or_default();

        Self {
            npc_id: str_field(value, "npcId", ""),
            npc_name: str_field(value, "npcName", ""),
            items,
            welcome_message: str_field(value, "welcomeMessage", ""),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogInfo {
    pub npc_name: String,
    pub text: String,
}

impl DialogInfo {
    pub fn from_value(value: &Value) -> Self {
        Self {
            npc_name: str_field(value, "npcName", "Unknown"),
            text: str_field(value, "text", ""),
        }
    }
}
