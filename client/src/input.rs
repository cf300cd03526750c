//! Keyboard capture and the key-to-request mapping

use crate::game::{ClientState, GameState, Modal, TradeMode, TraceDirection};
use crate::network::Outgoing;
use crate::queue::BoundedQueue;
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{debug, warn};
use parking_lot::Mutex;
use shared::{Direction, Request, RequestKind};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// A decoded key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Enter,
    Backspace,
    Escape,
    /// Ctrl+C; leaves the client from any screen
    Quit,
}

/// Non-blocking source of key presses
pub trait KeySource {
    fn poll_key(&mut self) -> Option<Key>;

    /// Latest terminal size seen while polling, reported once
    fn take_resize(&mut self) -> Option<(u16, u16)> {
        None
    }
}

/// Scripted keys, handed out front to back
impl KeySource for VecDeque<Key> {
    fn poll_key(&mut self) -> Option<Key> {
        self.pop_front()
    }
}

/// Reads key presses from the terminal without waiting
#[derive(Debug, Default)]
pub struct TerminalKeys {
    resized: Option<(u16, u16)>,
}

impl KeySource for TerminalKeys {
    fn poll_key(&mut self) -> Option<Key> {
        loop {
            match event::poll(Duration::ZERO) {
                Ok(true) => {}
                Ok(false) => return None,
                Err(e) => {
                    warn!("Failed to poll terminal events: {}", e);
                    return None;
                }
            }

            match event::read() {
                Ok(TermEvent::Key(key)) => {
                    if let Some(key) = decode_key(key) {
                        return Some(key);
                    }
                }
                Ok(TermEvent::Resize(width, height)) => self.resized = Some((width, height)),
                Ok(_) => {}
                Err(e) => {
                    warn!("Failed to read terminal event: {}", e);
                    return None;
                }
            }
        }
    }

    fn take_resize(&mut self) -> Option<(u16, u16)> {
        self.resized.take()
    }
}

/// Maps a terminal key event to a [`Key`]; releases, repeats and unmapped keys give `None`
pub fn decode_key(key: KeyEvent) -> Option<Key> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Key::Quit),
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Esc => Some(Key::Escape),
        _ => None,
    }
}

/// Turns key presses into state changes and outbound requests
pub struct InputProducer {
    outbound: Arc<BoundedQueue<Outgoing>>,
    state: Arc<Mutex<GameState>>,
}

impl InputProducer {
    pub fn new(outbound: Arc<BoundedQueue<Outgoing>>, state: Arc<Mutex<GameState>>) -> Self {
        Self { outbound, state }
    }

    /// Handles every key currently available from `keys`
    pub fn poll<K: KeySource + ?Sized>(&self, keys: &mut K) -> usize {
        let mut handled = 0;
        while let Some(key) = keys.poll_key() {
            self.handle_key(key);
            handled += 1;
        }
        handled
    }

    /// Applies one key press. The request it produced, if any, is traced under
    /// the state lock and queued after the lock is released.
    pub fn handle_key(&self, key: Key) -> Option<RequestKind> {
        let request = {
            let mut state = self.state.lock();
            let request = map_key(&mut state, key);
            if let Some(request) = &request {
                state.add_network_log(
                    TraceDirection::Out,
                    request.kind().as_str(),
                    &request.payload().to_string(),
                );
            }
            request
        };

        request.map(|request| {
            let kind = request.kind();
            debug!("Queueing {}", kind.as_str());
            self.outbound.put(Outgoing::Send(request));
            kind
        })
    }
}

/// Applies `key` to `state`, returning the request to send, if any
pub fn map_key(state: &mut GameState, key: Key) -> Option<Request> {
    if key == Key::Quit {
        state.exit_requested = true;
        return None;
    }

    match state.client_state {
        ClientState::WaitingForInit => None,
        ClientState::LoginScreen => login_key(state, key),
        ClientState::Playing => playing_key(state, key),
    }
}

fn is_char(key: Key, expected: char) -> bool {
    matches!(key, Key::Char(c) if c.eq_ignore_ascii_case(&expected))
}

fn login_key(state: &mut GameState, key: Key) -> Option<Request> {
    let classes = state.login_options.classes.len();
    let maps = state.login_options.maps.len();

    match (state.login_step, key) {
        (0, Key::Char(c)) if c.is_ascii_alphanumeric() || c == '_' || c == '-' => {
            state.input_username.push(c);
        }
        (0, Key::Backspace) => {
            state.input_username.pop();
        }
        (0, Key::Enter) if !state.input_username.is_empty() => state.login_step = 1,
        (1, Key::Up) => state.selected_class_index = state.selected_class_index.saturating_sub(1),
        (1, Key::Down) if state.selected_class_index + 1 < classes => {
            state.selected_class_index += 1;
        }
        (1, Key::Enter) if classes > 0 => state.login_step = 2,
        (2, Key::Up) => state.selected_map_index = state.selected_map_index.saturating_sub(1),
        (2, Key::Down) if state.selected_map_index + 1 < maps => state.selected_map_index += 1,
        (2, Key::Enter) => {
            let class = state.login_options.classes.get(state.selected_class_index)?;
            let map = state.login_options.maps.get(state.selected_map_index)?;
            let request = Request::login(&state.input_username, class, &map.map_id);
            state.login_step = 3;
            return Some(request);
        }
        _ => {}
    }
    None
}

fn playing_key(state: &mut GameState, key: Key) -> Option<Request> {
    match state.modal() {
        Some(Modal::Announcement) => {
            if matches!(key, Key::Enter | Key::Escape) {
                state.close_announcement();
            }
            None
        }
        Some(Modal::Dialog) => {
            if matches!(key, Key::Enter | Key::Escape) {
                state.close_dialog();
            }
            None
        }
        _ if state.show_help => {
            if key == Key::Escape || is_char(key, 'h') {
                state.toggle_help();
            }
            None
        }
        Some(Modal::Menu) => menu_key(state, key),
        Some(Modal::PayDebt) => debt_key(state, key),
        Some(Modal::Metro) => metro_key(state, key),
        Some(Modal::Trade) => trade_key(state, key),
        Some(Modal::Inventory) => inventory_key(state, key),
        None => standard_key(state, key),
    }
}

fn menu_key(state: &mut GameState, key: Key) -> Option<Request> {
    match key {
        Key::Escape => state.toggle_menu(),
        Key::Up => state.scroll_menu(-1),
        Key::Down => state.scroll_menu(1),
        Key::Enter => match state.menu_selection {
            0 => state.toggle_menu(),
            1 => state.toggle_help(),
            _ => state.exit_requested = true,
        },
        _ => {}
    }
    None
}

fn debt_key(state: &mut GameState, key: Key) -> Option<Request> {
    match key {
        Key::Escape => state.toggle_pay_debt(),
        Key::Backspace => {
            state.debt_input.pop();
        }
        Key::Char(c) if c.is_ascii_digit() => state.debt_input.push(c),
        Key::Enter if !state.debt_input.is_empty() => match state.debt_input.parse::<i64>() {
            Ok(amount) => {
                state.toggle_pay_debt();
                return Some(Request::pay_debt(amount));
            }
            Err(_) => state.set_error("Invalid amount"),
        },
        _ => {}
    }
    None
}

fn metro_key(state: &mut GameState, key: Key) -> Option<Request> {
    match key {
        Key::Up => state.scroll_metro(-1),
        Key::Down => state.scroll_metro(1),
        Key::Escape => state.close_modal(Modal::Metro),
        Key::Enter => {
            let station = state.selected_metro_station()?;
            if station.id.is_empty() {
                return None;
            }
            let request = Request::travel(&station.id, &state.metro_ui.line_id);
            state.close_modal(Modal::Metro);
            return Some(request);
        }
        _ => {}
    }
    None
}

fn trade_key(state: &mut GameState, key: Key) -> Option<Request> {
    match key {
        Key::Up => state.scroll_trade(-1),
        Key::Down => state.scroll_trade(1),
        Key::Escape => state.close_modal(Modal::Trade),
        Key::Enter => {
            return match state.trade_mode {
                TradeMode::Buy => state
                    .selected_trade_item()
                    .filter(|item| !item.id.is_empty())
                    .map(|_| Request::buy(&state.trade_ui.npc_id, state.trade_selection)),
                TradeMode::Sell => state
                    .selected_inventory_slot()
                    .map(|slot| Request::sell(&state.trade_ui.npc_id, slot)),
            };
        }
        key if is_char(key, 's') => state.toggle_trade_mode(),
        _ => {}
    }
    None
}

fn inventory_key(state: &mut GameState, key: Key) -> Option<Request> {
    match key {
        Key::Escape => state.toggle_inventory(),
        Key::Up => state.scroll_inventory(-1),
        Key::Down => state.scroll_inventory(1),
        key if is_char(key, 'i') => state.toggle_inventory(),
        key if is_char(key, 'e') => return state.selected_inventory_slot().map(Request::equip),
        key if is_char(key, 'u') => return state.selected_inventory_slot().map(Request::use_item),
        key if is_char(key, 'd') => {
            return state
                .selected_inventory_slot()
                .map(|slot| Request::drop_item(slot, 1));
        }
        _ => {}
    }
    None
}

fn standard_key(state: &mut GameState, key: Key) -> Option<Request> {
    match key {
        Key::Up => Some(Request::movement(Direction::Up)),
        Key::Down => Some(Request::movement(Direction::Down)),
        Key::Left => Some(Request::movement(Direction::Left)),
        Key::Right => Some(Request::movement(Direction::Right)),
        Key::Char(' ') => Some(Request::attack()),
        Key::Escape => {
            state.toggle_menu();
            None
        }
        key if is_char(key, 'e') => Some(Request::interact()),
        key if is_char(key, 'u') => Some(Request::use_item(0)),
        key => {
            if is_char(key, 'i') {
                state.toggle_inventory();
            } else if is_char(key, 'l') {
                state.toggle_logs();
            } else if is_char(key, 'h') {
                state.toggle_help();
            } else if is_char(key, 'p') {
                state.toggle_pay_debt();
            }
            None
        }
    }
}
