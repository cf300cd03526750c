//! Applies inbound events to the shared game state
//!
//! The dispatcher is the only consumer of the inbound queue and the only
//! writer of server-confirmed state. Each event is handled under one short
//! lock; nothing blocking happens while the lock is held.

use crate::game::{ClientState, GameState, TraceDirection};
use crate::network::Outgoing;
use crate::queue::BoundedQueue;
use log::{debug, trace, warn};
use parking_lot::Mutex;
use serde_json::Value;
use shared::dto::{self, i32_field, i64_field, slot_field, str_field};
use shared::{
    DialogInfo, Event, EventKind, LoginOptions, MapData, MapObject, MetroUi, Npc, OtherPlayer,
    Request, TradeUi,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct Dispatcher {
    inbound: Arc<BoundedQueue<Event>>,
    outbound: Arc<BoundedQueue<Outgoing>>,
    state: Arc<Mutex<GameState>>,
    running: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(
        inbound: Arc<BoundedQueue<Event>>,
        outbound: Arc<BoundedQueue<Outgoing>>,
        state: Arc<Mutex<GameState>>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            inbound,
            outbound,
            state,
            running,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Takes events until the inbound queue is empty, including any that
    /// arrive while the tick runs. Returns `false` once the client should
    /// stop, either because exit was requested from the menu or because the
    /// running flag was cleared elsewhere.
    pub fn tick(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        if self.state.lock().exit_requested {
            debug!("Exit requested, dispatcher stopping");
            self.running.store(false, Ordering::Release);
            return false;
        }

        while let Some(event) = self.inbound.try_take() {
            self.handle_event(event);
        }
        true
    }

    pub fn handle_event(&self, event: Event) {
        let (kind, payload) = event.into_parts();

        match kind {
            EventKind::ConnectionEstablished => {
                {
                    let mut state = self.state.lock();
                    state.connection_status = "Connected. Sending INIT...".to_string();
                    state.add_network_log(TraceDirection::Out, "INIT", "null");
                }
                self.outbound.put(Outgoing::Send(Request::init()));
            }
            EventKind::Unknown(tag) => {
                warn!("Unknown event type: {}", tag);
                self.state.lock().connection_status = format!("Unknown Event: {}", tag);
            }
            kind if payload.is_null() && kind.requires_payload() => {
                trace!("Skipping {} with null payload", kind.tag());
            }
            kind => {
                debug!("Dispatching {}", kind.tag());
                let mut state = self.state.lock();
                state.add_network_log(TraceDirection::In, kind.tag(), &payload.to_string());
                apply(&mut state, &kind, &payload);
            }
        }
    }
}

/// Routes one event to its handler. Pure state mutation, no I/O.
pub fn apply(state: &mut GameState, kind: &EventKind, data: &Value) {
    match kind {
        EventKind::Stats => apply_stats(state, data),
        EventKind::Inventory => apply_inventory(state, data),
        EventKind::PlayerPosition => apply_position(state, data),
        EventKind::MapData => apply_map(state, data),
        EventKind::LoginOptions => apply_login_options(state, data),
        EventKind::Npcs => state.npcs = Npc::list_from_value(data),
        EventKind::MapObjects => state.objects = MapObject::list_from_value(data),
        EventKind::ChatBroadcast => apply_chat(state, data),
        EventKind::OpenMetroUi => {
            state.set_metro_ui(MetroUi::from_value(data));
            state.add_game_log("Metro UI opened.");
        }
        EventKind::OpenTradeUi => {
            state.set_trade_ui(TradeUi::from_value(data));
            state.add_game_log("Trade UI opened.");
        }
        EventKind::GameOver => {
            state.add_game_log("GAME OVER!");
            state.set_error("YOU DIED! Restart client to respawn.");
        }
        EventKind::Message => apply_message(state, data, false),
        EventKind::Error => apply_message(state, data, true),
        EventKind::GlobalAnnouncement => apply_announcement(state, data),
        EventKind::Players => {
            let self_id = state.player.id.clone();
            state.other_players = OtherPlayer::list_from_value(data, &self_id);
        }
        EventKind::Dialog => {
            let dialog = DialogInfo::from_value(data);
            state.add_game_log(&format!("Dialog started with {}", dialog.npc_name));
            state.open_dialog(dialog);
        }
        EventKind::ConnectionEstablished | EventKind::Unknown(_) => {}
    }
}

fn apply_stats(state: &mut GameState, data: &Value) {
    let player = &mut state.player;
    player.id = str_field(data, "id", &player.id);
    player.name = str_field(data, "name", &player.name);
    player.hp = i32_field(data, "hp", player.hp);
    player.max_hp = i32_field(data, "maxHp", player.max_hp);
    player.rads = i32_field(data, "rads", player.rads);
    player.rads_limit = i32_field(data, "radsLimit", player.rads_limit);
    player.credits = i32_field(data, "credits", player.credits);
    player.debt = i32_field(data, "debt", player.debt);
    player.global_debt = i64_field(data, "globalDebt", player.global_debt);
    player.equipped_weapon_slot =
        slot_field(data, "equippedWeaponSlot", &player.equipped_weapon_slot);
    player.equipped_mask_slot = slot_field(data, "equippedMaskSlot", &player.equipped_mask_slot);

    state.advance_to(ClientState::Playing);
    state.clear_error();
}

fn apply_inventory(state: &mut GameState, data: &Value) {
    state.replace_inventory(dto::parse_inventory(data));
    state.advance_to(ClientState::Playing);
}

fn apply_position(state: &mut GameState, data: &Value) {
    let player = &mut state.player;
    player.x = i32_field(data, "x", player.x);
    player.y = i32_field(data, "y", player.y);
    player.layer_index = i32_field(data, "z", player.layer_index);
    state.advance_to(ClientState::Playing);
}

fn apply_map(state: &mut GameState, data: &Value) {
    state.map = MapData::from_value(data);
    debug!(
        "Updated map: {} range {}x{}",
        state.map.map_name, state.map.range_x, state.map.range_y
    );
    let line = format!("Map loaded: {}", state.map.map_name);
    state.add_game_log(&line);
}

fn apply_login_options(state: &mut GameState, data: &Value) {
    state.login_options = LoginOptions::from_value(data);
    state.login_step = 0;
    state.selected_class_index = 0;
    state.selected_map_index = 0;
    state.advance_to(ClientState::LoginScreen);
    state.add_game_log("Login options received.");
}

fn apply_chat(state: &mut GameState, data: &Value) {
    let message = str_field(data, "message", "");
    state.add_chat_message(&message);
    state.add_game_log(&format!("CHAT: {}", message));
}

fn apply_message(state: &mut GameState, data: &Value, is_error: bool) {
    if let Some(message) = data.as_str() {
        state.add_chat_message(message);
        if is_error {
            state.set_error(message);
        }
    }
}

fn apply_announcement(state: &mut GameState, data: &Value) {
    if let Some(message) = data.as_str() {
        let line = format!("[GLOBAL] {}", message);
        state.add_chat_message(&line);
        state.add_game_log(&line);
        state.show_announcement(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Modal;
    use serde_json::json;
    use shared::{DecodeTable, RequestKind};

    struct Harness {
        dispatcher: Dispatcher,
        inbound: Arc<BoundedQueue<Event>>,
        outbound: Arc<BoundedQueue<Outgoing>>,
        state: Arc<Mutex<GameState>>,
    }

    fn harness() -> Harness {
        let inbound = Arc::new(BoundedQueue::new());
        let outbound = Arc::new(BoundedQueue::new());
        let state = Arc::new(Mutex::new(GameState::new()));
        let dispatcher = Dispatcher::new(
            Arc::clone(&inbound),
            Arc::clone(&outbound),
            Arc::clone(&state),
            Arc::new(AtomicBool::new(true)),
        );
        Harness {
            dispatcher,
            inbound,
            outbound,
            state,
        }
    }

    fn feed(h: &mut Harness, kind: EventKind, payload: Value) {
        h.inbound.put(Event::new(kind, payload));
        assert!(h.dispatcher.tick());
    }

    #[test]
    fn test_connection_established_sends_exactly_one_init() {
        let mut h = harness();
        feed(&mut h, EventKind::ConnectionEstablished, Value::Null);

        match h.outbound.try_take() {
            Some(Outgoing::Send(request)) => assert_eq!(request.kind(), RequestKind::Init),
            other => panic!("expected INIT, got {:?}", other),
        }
        assert!(h.outbound.try_take().is_none());
        assert_eq!(h.state.lock().connection_status, "Connected. Sending INIT...");
    }

    #[test]
    fn test_partial_stats_merge() {
        let mut h = harness();
        {
            let mut state = h.state.lock();
            state.player.credits = 300;
            state.player.max_hp = 120;
            state.player.rads = 7;
        }

        feed(&mut h, EventKind::Stats, json!({"hp": 42}));

        let state = h.state.lock();
        assert_eq!(state.player.hp, 42);
        assert_eq!(state.player.credits, 300);
        assert_eq!(state.player.max_hp, 120);
        assert_eq!(state.player.rads, 7);
        assert_eq!(state.client_state, ClientState::Playing);
    }

    #[test]
    fn test_stats_tolerate_wrong_types_and_clear_error() {
        let mut h = harness();
        h.state.lock().set_error("old");

        feed(
            &mut h,
            EventKind::Stats,
            json!({"hp": "full", "credits": 15, "equippedWeaponSlot": 2, "equippedMaskSlot": null}),
        );

        let state = h.state.lock();
        assert_eq!(state.player.hp, 0);
        assert_eq!(state.player.credits, 15);
        assert_eq!(state.player.equipped_weapon_slot, "2");
        assert_eq!(state.player.equipped_mask_slot, "");
        assert!(state.last_error.is_empty());
    }

    #[test]
    fn test_unknown_tag_only_touches_status() {
        let mut h = harness();
        let before = h.state.lock().clone();

        feed(
            &mut h,
            EventKind::Unknown("SEND_WEATHER".into()),
            json!({"rain": true}),
        );

        let state = h.state.lock();
        assert_eq!(state.connection_status, "Unknown Event: SEND_WEATHER");
        assert_eq!(state.player, before.player);
        assert_eq!(state.client_state, before.client_state);
        assert_eq!(state.chat_history, before.chat_history);
        assert_eq!(state.network_logs, before.network_logs);
        assert_eq!(state.modal(), before.modal());
        assert!(h.outbound.is_empty());
    }

    #[test]
    fn test_unknown_tag_with_null_payload_still_reports_status() {
        let mut h = harness();
        let before = h.state.lock().clone();

        feed(&mut h, EventKind::Unknown("SEND_WEATHER".into()), Value::Null);

        let state = h.state.lock();
        assert_eq!(state.connection_status, "Unknown Event: SEND_WEATHER");
        assert_eq!(state.network_logs, before.network_logs);
        assert!(h.outbound.is_empty());
    }

    #[test]
    fn test_connection_established_frame_from_server_sends_nothing() {
        let mut h = harness();
        h.state.lock().advance_to(ClientState::Playing);
        h.state.lock().connection_status = "Connected. Sending INIT...".into();

        let event = DecodeTable::standard()
            .decode(r#"{"type": "CONNECTION_ESTABLISHED"}"#)
            .unwrap();
        h.inbound.put(event);
        assert!(h.dispatcher.tick());

        assert!(h.outbound.is_empty());
        let state = h.state.lock();
        assert_eq!(
            state.connection_status,
            "Unknown Event: CONNECTION_ESTABLISHED"
        );
        assert_eq!(state.client_state, ClientState::Playing);
    }

    #[test]
    fn test_tick_drains_queue_until_empty() {
        let mut h = harness();
        for x in 0..50 {
            h.inbound.put(Event::new(EventKind::PlayerPosition, json!({"x": x})));
        }

        assert!(h.dispatcher.tick());

        assert!(h.inbound.is_empty());
        assert_eq!(h.state.lock().player.x, 49);
    }

    #[test]
    fn test_null_payload_is_skipped() {
        let mut h = harness();
        feed(&mut h, EventKind::Stats, Value::Null);

        let state = h.state.lock();
        assert_eq!(state.client_state, ClientState::WaitingForInit);
        assert!(state.network_logs.is_empty());
    }

    #[test]
    fn test_game_over_needs_no_payload() {
        let mut h = harness();
        feed(&mut h, EventKind::GameOver, Value::Null);

        let state = h.state.lock();
        assert_eq!(state.last_error, "YOU DIED! Restart client to respawn.");
        assert!(state.game_logs.back().unwrap().ends_with("GAME OVER!"));
    }

    #[test]
    fn test_events_are_applied_in_arrival_order() {
        let mut h = harness();
        h.inbound
            .put(Event::new(EventKind::PlayerPosition, json!({"x": 1, "y": 1})));
        h.inbound
            .put(Event::new(EventKind::PlayerPosition, json!({"x": 5})));
        h.inbound
            .put(Event::new(EventKind::PlayerPosition, json!({"y": 9, "z": 2})));
        assert!(h.dispatcher.tick());

        let state = h.state.lock();
        assert_eq!((state.player.x, state.player.y), (5, 9));
        assert_eq!(state.player.layer_index, 2);
        assert!(h.inbound.is_empty());
    }

    #[test]
    fn test_login_options_enter_login_screen_once() {
        let mut h = harness();
        let options = json!({"classes": ["STALKER"], "maps": [{"mapId": "m1", "mapName": "Polis"}]});

        feed(&mut h, EventKind::LoginOptions, options.clone());
        {
            let mut state = h.state.lock();
            assert_eq!(state.client_state, ClientState::LoginScreen);
            assert_eq!(state.login_options.maps[0].map_name, "Polis");
            state.login_step = 2;
        }

        feed(&mut h, EventKind::PlayerPosition, json!({"x": 3}));
        feed(&mut h, EventKind::LoginOptions, options);

        let state = h.state.lock();
        assert_eq!(state.client_state, ClientState::Playing);
        assert_eq!(state.login_step, 0);
    }

    #[test]
    fn test_inventory_replaces_slots() {
        let mut h = harness();
        feed(
            &mut h,
            EventKind::Inventory,
            json!({"0": {"id": "knife"}, "3": {"id": "medkit"}}),
        );
        feed(&mut h, EventKind::Inventory, json!({"4": {"id": "filter"}, "5": null}));

        let state = h.state.lock();
        assert_eq!(state.player.inventory.len(), 1);
        assert_eq!(state.selected_inventory_slot(), Some(4));
    }

    #[test]
    fn test_trade_ui_replaces_open_inventory() {
        let mut h = harness();
        h.state.lock().toggle_inventory();

        feed(
            &mut h,
            EventKind::OpenTradeUi,
            json!({"npcId": "n1", "npcName": "Trader", "items": [{"id": "ammo"}]}),
        );
        feed(
            &mut h,
            EventKind::OpenTradeUi,
            json!({"npcId": "n1", "npcName": "Trader", "items": []}),
        );

        let state = h.state.lock();
        assert_eq!(state.modal(), Some(Modal::Trade));
        assert_eq!(state.trade_ui.npc_name, "Trader");
    }

    #[test]
    fn test_metro_ui_resets_selection() {
        let mut h = harness();
        h.state.lock().metro_selection = 4;

        feed(
            &mut h,
            EventKind::OpenMetroUi,
            json!({"lineId": "red", "stations": [{"id": "a", "name": "A"}]}),
        );

        let state = h.state.lock();
        assert!(state.is_open(Modal::Metro));
        assert_eq!(state.metro_selection, 0);
        assert_eq!(state.selected_metro_station().unwrap().id, "a");
    }

    #[test]
    fn test_error_message_sets_error_flag() {
        let mut h = harness();
        feed(&mut h, EventKind::Message, json!("Welcome"));
        feed(&mut h, EventKind::Error, json!("Not enough credits"));
        feed(&mut h, EventKind::Error, json!({"not": "a string"}));

        let state = h.state.lock();
        assert_eq!(state.chat_history.len(), 2);
        assert_eq!(state.last_error, "Not enough credits");
    }

    #[test]
    fn test_global_announcement_prefixes_chat_and_opens_modal() {
        let mut h = harness();
        h.state.lock().toggle_menu();

        feed(&mut h, EventKind::GlobalAnnouncement, json!("Gates close at midnight"));

        let state = h.state.lock();
        assert_eq!(
            state.chat_history.back().map(String::as_str),
            Some("[GLOBAL] Gates close at midnight")
        );
        assert_eq!(state.modal(), Some(Modal::Announcement));
        assert_eq!(state.announcement, "Gates close at midnight");
    }

    #[test]
    fn test_players_exclude_local_id() {
        let mut h = harness();
        feed(&mut h, EventKind::Stats, json!({"id": "me"}));
        feed(
            &mut h,
            EventKind::Players,
            json!([{"id": "me", "x": 1}, {"id": "you", "name": "Miller"}]),
        );

        let state = h.state.lock();
        assert_eq!(state.other_players.len(), 1);
        assert_eq!(state.other_players[0].name, "Miller");
    }

    #[test]
    fn test_dialog_opens_modal() {
        let mut h = harness();
        feed(&mut h, EventKind::Dialog, json!({"text": "Stay close."}));

        let state = h.state.lock();
        assert!(state.is_open(Modal::Dialog));
        assert_eq!(state.dialog.npc_name, "Unknown");
        assert_eq!(state.dialog.text, "Stay close.");
    }

    #[test]
    fn test_map_npcs_objects_and_chat() {
        let mut h = harness();
        feed(
            &mut h,
            EventKind::MapData,
            json!({"mapName": "Riga", "center": {"x": 4, "y": 4, "z": 0}, "range": {"x": 2, "y": 2}}),
        );
        feed(&mut h, EventKind::Npcs, json!([{"id": "n1", "name": "Ulman"}]));
        feed(&mut h, EventKind::MapObjects, json!([{"id": "o1", "type": "CHEST"}]));
        feed(&mut h, EventKind::ChatBroadcast, json!({"message": "hello tunnel"}));

        let state = h.state.lock();
        assert_eq!(state.map.map_name, "Riga");
        assert_eq!(state.npcs[0].name, "Ulman");
        assert_eq!(state.objects[0].kind, "CHEST");
        assert_eq!(state.chat_history.back().map(String::as_str), Some("hello tunnel"));
        assert_eq!(state.network_logs.len(), 4);
    }

    #[test]
    fn test_exit_request_stops_before_draining() {
        let mut h = harness();
        h.state.lock().exit_requested = true;
        h.inbound.put(Event::new(EventKind::Stats, json!({"hp": 1})));

        assert!(!h.dispatcher.tick());
        assert!(!h.dispatcher.is_running());
        assert!(!h.dispatcher.tick());
        assert_eq!(h.inbound.len(), 1);
    }
}
