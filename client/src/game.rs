//! Client-side game state snapshot shared between the game loop and renderer

use shared::{
    DialogInfo, Item, LoginOptions, MapData, MapObject, MetroUi, Npc, OtherPlayer, Station,
    TradeUi, CHAT_HISTORY_LIMIT, GAME_LOG_LIMIT, MENU_ENTRIES, NETWORK_LOG_LIMIT,
    TRACE_PAYLOAD_PREVIEW,
};
use std::collections::{BTreeMap, VecDeque};

/// Lifecycle phase. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClientState {
    WaitingForInit,
    LoginScreen,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeMode {
    Buy,
    Sell,
}

/// Modal windows; at most one is open at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modal {
    Inventory,
    Metro,
    Trade,
    Menu,
    PayDebt,
    Announcement,
    Dialog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDirection {
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkLogEntry {
    pub timestamp: String,
    pub direction: TraceDirection,
    pub tag: String,
    pub payload: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    pub id: String,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub layer_index: i32,
    pub hp: i32,
    pub max_hp: i32,
    pub rads: i32,
    pub rads_limit: i32,
    pub credits: i32,
    pub debt: i32,
    pub global_debt: i64,
    pub inventory: BTreeMap<i32, Item>,
    pub equipped_weapon_slot: String,
    pub equipped_mask_slot: String,
}

impl PlayerState {
    fn new() -> Self {
        Self {
            max_hp: 100,
            ..Self::default()
        }
    }
}

/// The single mutable snapshot of everything the client knows.
///
/// Server-confirmed data is written only by the dispatcher; the input producer
/// touches the navigation fields (selections, modals, text buffers).
#[derive(Debug, Clone)]
pub struct GameState {
    pub client_state: ClientState,
    pub login_options: LoginOptions,
    pub input_username: String,
    pub selected_class_index: usize,
    pub selected_map_index: usize,
    pub login_step: u8,

    pub player: PlayerState,
    pub other_players: Vec<OtherPlayer>,
    pub map: MapData,
    pub npcs: Vec<Npc>,
    pub objects: Vec<MapObject>,

    pub connection_status: String,
    pub last_error: String,
    pub chat_history: VecDeque<String>,
    pub game_logs: VecDeque<String>,
    pub network_logs: VecDeque<NetworkLogEntry>,

    modal: Option<Modal>,
    pub metro_ui: MetroUi,
    pub metro_selection: usize,
    pub trade_ui: TradeUi,
    pub trade_selection: usize,
    pub trade_mode: TradeMode,
    pub inventory_selection: usize,
    pub menu_selection: usize,
    pub debt_input: String,
    pub announcement: String,
    pub dialog: DialogInfo,

    pub show_logs: bool,
    pub show_help: bool,
    pub exit_requested: bool,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            client_state: ClientState::WaitingForInit,
            login_options: LoginOptions::default(),
            input_username: String::new(),
            selected_class_index: 0,
            selected_map_index: 0,
            login_step: 0,
            player: PlayerState::new(),
            other_players: Vec::new(),
            map: MapData::default(),
            npcs: Vec::new(),
            objects: Vec::new(),
            connection_status: "Connecting to server...".to_string(),
            last_error: String::new(),
            chat_history: VecDeque::new(),
            game_logs: VecDeque::new(),
            network_logs: VecDeque::new(),
            modal: None,
            metro_ui: MetroUi::default(),
            metro_selection: 0,
            trade_ui: TradeUi::default(),
            trade_selection: 0,
            trade_mode: TradeMode::Buy,
            inventory_selection: 0,
            menu_selection: 0,
            debt_input: String::new(),
            announcement: String::new(),
            dialog: DialogInfo::default(),
            show_logs: false,
            show_help: false,
            exit_requested: false,
        }
    }

    /// Moves the lifecycle forward; requests to go back are ignored
    pub fn advance_to(&mut self, phase: ClientState) {
        if phase > self.client_state {
            self.client_state = phase;
        }
    }

    pub fn modal(&self) -> Option<Modal> {
        self.modal
    }

    pub fn is_open(&self, modal: Modal) -> bool {
        self.modal == Some(modal)
    }

    /// Opens `modal`, closing whichever other modal was open
    pub fn open_modal(&mut self, modal: Modal) {
        self.modal = Some(modal);
    }

    pub fn close_modal(&mut self, modal: Modal) {
        if self.modal == Some(modal) {
            self.modal = None;
        }
    }

    fn toggle_modal(&mut self, modal: Modal) -> bool {
        if self.is_open(modal) {
            self.modal = None;
            false
        } else {
            self.modal = Some(modal);
            true
        }
    }

    pub fn replace_inventory(&mut self, slots: BTreeMap<i32, Item>) {
        self.player.inventory = slots;
        let count = self.player.inventory.len();
        if self.inventory_selection >= count {
            self.inventory_selection = count.saturating_sub(1);
        }
    }

    pub fn toggle_inventory(&mut self) {
        self.toggle_modal(Modal::Inventory);
    }

    pub fn scroll_inventory(&mut self, delta: isize) {
        self.inventory_selection = wrap_index(
            self.inventory_selection,
            delta,
            self.player.inventory.len(),
        );
    }

    /// Slot number under the inventory cursor, `None` when the inventory is empty
    pub fn selected_inventory_slot(&self) -> Option<i32> {
        self.player
            .inventory
            .keys()
            .nth(self.inventory_selection)
            .copied()
    }

    pub fn set_metro_ui(&mut self, metro: MetroUi) {
        self.metro_ui = metro;
        self.metro_selection = 0;
        self.open_modal(Modal::Metro);
    }

    pub fn scroll_metro(&mut self, delta: isize) {
        self.metro_selection =
            wrap_index(self.metro_selection, delta, self.metro_ui.stations.len());
    }

    pub fn selected_metro_station(&self) -> Option<&Station> {
        self.metro_ui.stations.get(self.metro_selection)
    }

    pub fn set_trade_ui(&mut self, trade: TradeUi) {
        self.trade_ui = trade;
        self.trade_selection = 0;
        self.trade_mode = TradeMode::Buy;
        self.open_modal(Modal::Trade);
    }

    /// Scrolls the vendor list when buying, the player's inventory when selling
    pub fn scroll_trade(&mut self, delta: isize) {
        match self.trade_mode {
            TradeMode::Buy => {
                self.trade_selection =
                    wrap_index(self.trade_selection, delta, self.trade_ui.items.len());
            }
            TradeMode::Sell => self.scroll_inventory(delta),
        }
    }

    pub fn selected_trade_item(&self) -> Option<&Item> {
        self.trade_ui.items.get(self.trade_selection)
    }

    pub fn toggle_trade_mode(&mut self) {
        self.trade_mode = match self.trade_mode {
            TradeMode::Buy => TradeMode::Sell,
            TradeMode::Sell => TradeMode::Buy,
        };
    }

    pub fn toggle_menu(&mut self) {
        self.toggle_modal(Modal::Menu);
        self.menu_selection = 0;
    }

    pub fn scroll_menu(&mut self, delta: isize) {
        self.menu_selection = wrap_index(self.menu_selection, delta, MENU_ENTRIES);
    }

    pub fn toggle_pay_debt(&mut self) {
        self.toggle_modal(Modal::PayDebt);
        self.debt_input.clear();
    }

    pub fn show_announcement(&mut self, message: &str) {
        self.announcement = message.to_string();
        self.open_modal(Modal::Announcement);
    }

    pub fn close_announcement(&mut self) {
        self.close_modal(Modal::Announcement);
        self.announcement.clear();
    }

    pub fn open_dialog(&mut self, dialog: DialogInfo) {
        self.dialog = dialog;
        self.open_modal(Modal::Dialog);
    }

    pub fn close_dialog(&mut self) {
        self.close_modal(Modal::Dialog);
        self.dialog = DialogInfo::default();
    }

    pub fn toggle_logs(&mut self) {
        self.show_logs = !self.show_logs;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn add_chat_message(&mut self, message: &str) {
        push_bounded(
            &mut self.chat_history,
            message.to_string(),
            CHAT_HISTORY_LIMIT,
        );
    }

    pub fn add_game_log(&mut self, message: &str) {
        let line = format!("[{}] {}", clock(), message);
        push_bounded(&mut self.game_logs, line, GAME_LOG_LIMIT);
    }

    pub fn add_network_log(&mut self, direction: TraceDirection, tag: &str, payload: &str) {
        let mut preview: String = payload.chars().take(TRACE_PAYLOAD_PREVIEW).collect();
        if payload.chars().count() > TRACE_PAYLOAD_PREVIEW {
            preview.push_str("...");
        }

        let entry = NetworkLogEntry {
            timestamp: clock(),
            direction,
            tag: tag.to_string(),
            payload: preview,
        };
        push_bounded(&mut self.network_logs, entry, NETWORK_LOG_LIMIT);
    }

    pub fn set_error(&mut self, error: &str) {
        self.last_error = error.to_string();
    }

    pub fn clear_error(&mut self) {
        self.last_error.clear();
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Moves `current` by `delta` within `[0, len)`, wrapping at both ends.
/// Returns 0 for an empty list.
pub fn wrap_index(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let len = len as isize;
    let current = (current as isize).min(len - 1);
    (current + delta).rem_euclid(len) as usize
}

fn push_bounded<T>(log: &mut VecDeque<T>, entry: T, limit: usize) {
    log.push_back(entry);
    while log.len() > limit {
        log.pop_front();
    }
}

fn clock() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
