//! Terminal rendering of the game state

use crate::game::{ClientState, GameState, Modal, TradeMode, TraceDirection};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use log::{debug, info};
use std::io::{self, Write};

/// Draws a snapshot of the game state
pub trait Renderer {
    fn render(&mut self, state: &GameState) -> io::Result<()>;

    /// Called when the terminal reports a new size
    fn resize(&mut self, _width: u16, _height: u16) {}
}

const DEFAULT_WIDTH: u16 = 100;
const DEFAULT_HEIGHT: u16 = 40;
const FALLBACK_VIEW_WIDTH: i32 = 60;
const FALLBACK_VIEW_HEIGHT: i32 = 20;
const CHAT_LINES: usize = 4;

#[derive(Debug, Clone, PartialEq)]
struct Line {
    text: String,
    color: Color,
}

impl Line {
    fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }

    fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Color::White)
    }
}

/// Writes full frames to any `Write` target with crossterm commands
pub struct TerminalRenderer<W: Write> {
    out: W,
    width: u16,
    height: u16,
}

impl TerminalRenderer<io::Stdout> {
    pub fn stdout() -> Self {
        let (width, height) = terminal::size().unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT));
        Self::with_size(io::stdout(), width, height)
    }
}

impl<W: Write> TerminalRenderer<W> {
    pub fn with_size(out: W, width: u16, height: u16) -> Self {
        Self { out, width, height }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render(&mut self, state: &GameState) -> io::Result<()> {
        let lines = compose(state, self.width as usize, self.height as usize);

        queue!(self.out, Clear(ClearType::All))?;
        for (row, line) in lines.iter().take(self.height as usize).enumerate() {
            let text: String = line.text.chars().take(self.width as usize).collect();
            queue!(
                self.out,
                MoveTo(0, row as u16),
                SetForegroundColor(line.color),
                Print(text),
                ResetColor
            )?;
        }
        self.out.flush()
    }

    fn resize(&mut self, width: u16, height: u16) {
        debug!("Terminal resized to {}x{}", width, height);
        self.width = width;
        self.height = height;
    }
}

/// Raw mode plus the alternate screen for as long as the guard lives
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        info!("Terminal switched to raw mode");
        Ok(Self { _private: () })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

fn compose(state: &GameState, width: usize, height: usize) -> Vec<Line> {
    let mut lines = match state.client_state {
        ClientState::WaitingForInit => waiting_screen(state),
        ClientState::LoginScreen => login_screen(state),
        ClientState::Playing => game_screen(state, width, height),
    };

    if !state.last_error.is_empty() {
        lines.push(Line::new(format!("! {}", state.last_error), Color::Red));
    }
    lines.push(Line::new(state.connection_status.clone(), Color::DarkGrey));
    lines
}

fn waiting_screen(_state: &GameState) -> Vec<Line> {
    vec![
        Line::new("== METRO ==", Color::Cyan),
        Line::plain(""),
        Line::plain("Waiting for the server..."),
    ]
}

fn login_screen(state: &GameState) -> Vec<Line> {
    let mut lines = vec![Line::new("== METRO :: LOGIN ==", Color::Cyan), Line::plain("")];

    let name_color = if state.login_step == 0 {
        Color::Yellow
    } else {
        Color::White
    };
    lines.push(Line::new(
        format!("Name: {}", state.input_username),
        name_color,
    ));

    lines.push(Line::plain(""));
    lines.push(Line::plain("Class:"));
    for (i, class) in state.login_options.classes.iter().enumerate() {
        lines.push(choice(
            class,
            i == state.selected_class_index,
            state.login_step == 1,
        ));
    }

    lines.push(Line::plain(""));
    lines.push(Line::plain("Starting station:"));
    for (i, map) in state.login_options.maps.iter().enumerate() {
        lines.push(choice(
            &map.map_name,
            i == state.selected_map_index,
            state.login_step == 2,
        ));
    }

    lines.push(Line::plain(""));
    let hint = match state.login_step {
        0 => "Type a name, Enter to continue",
        1 | 2 => "Up/Down to choose, Enter to confirm",
        _ => "Logging in...",
    };
    lines.push(Line::new(hint, Color::DarkGrey));
    lines
}

fn choice(label: &str, selected: bool, active: bool) -> Line {
    let marker = if selected { ">" } else { " " };
    let color = match (selected, active) {
        (true, true) => Color::Yellow,
        (true, false) => Color::White,
        _ => Color::DarkGrey,
    };
    Line::new(format!(" {} {}", marker, label), color)
}

fn game_screen(state: &GameState, width: usize, height: usize) -> Vec<Line> {
    let mut lines = vec![stats_bar(state)];

    let reserved = 6 + CHAT_LINES + if state.show_logs { 10 } else { 0 };
    let view_height = height.saturating_sub(reserved).max(3);

    let body = if state.show_help {
        help_panel()
    } else if let Some(modal) = state.modal() {
        modal_panel(state, modal)
    } else {
        let mut view = vec![Line::new(
            format!("SECTOR: {}", state.map.map_name),
            Color::Cyan,
        )];
        view.extend(
            map_viewport(state, width as i32, view_height as i32)
                .into_iter()
                .map(|row| Line::plain(row)),
        );
        view
    };
    lines.extend(body);

    lines.push(Line::plain(""));
    let skip = state.chat_history.len().saturating_sub(CHAT_LINES);
    for message in state.chat_history.iter().skip(skip) {
        lines.push(Line::new(message.clone(), Color::Green));
    }

    if state.show_logs {
        lines.push(Line::new("-- log --", Color::DarkGrey));
        for entry in &state.game_logs {
            lines.push(Line::plain(entry.clone()));
        }
        lines.push(Line::new("-- network --", Color::DarkGrey));
        for entry in &state.network_logs {
            let arrow = match entry.direction {
                TraceDirection::In => "<-",
                TraceDirection::Out => "->",
            };
            lines.push(Line::new(
                format!(
                    "[{}] {} {} {}",
                    entry.timestamp, arrow, entry.tag, entry.payload
                ),
                Color::DarkGrey,
            ));
        }
    }

    lines
}

fn stats_bar(state: &GameState) -> Line {
    let p = &state.player;
    let mut text = format!(
        "{} | HP {}/{} | RAD {}/{} | CR {} | DEBT {} (global {}) | {},{},{}",
        p.name,
        p.hp,
        p.max_hp,
        p.rads,
        p.rads_limit,
        p.credits,
        p.debt,
        p.global_debt,
        p.x,
        p.y,
        p.layer_index
    );
    if !p.equipped_weapon_slot.is_empty() {
        text.push_str(&format!(" | W:{}", p.equipped_weapon_slot));
    }
    if !p.equipped_mask_slot.is_empty() {
        text.push_str(&format!(" | M:{}", p.equipped_mask_slot));
    }

    let color = if p.max_hp > 0 && i64::from(p.hp) * 4 <= i64::from(p.max_hp) {
        Color::Red
    } else {
        Color::White
    };
    Line::new(text, color)
}

/// Map rows around the server-provided center with entities drawn on top.
/// The player is `@`, other players `P`, NPCs `N` (or `M` when aggressive),
/// map objects by type.
fn map_viewport(state: &GameState, max_width: i32, max_height: i32) -> Vec<String> {
    let map = &state.map;
    let rows = map.layer(map.center_z);

    // Range and center come straight from the server: widen to i64 and cap
    // the window to the screen before allocating.
    let mut range_x = i64::from(map.range_x.max(0));
    let mut range_y = i64::from(map.range_y.max(0));
    if range_x == 0 && range_y == 0 {
        if let Some(rows) = rows.filter(|rows| !rows.is_empty()) {
            range_y = rows.len() as i64 / 2;
            range_x = rows[0].chars().count() as i64 / 2;
        }
    }

    let width = if range_x > 0 {
        range_x * 2 + 1
    } else {
        i64::from(FALLBACK_VIEW_WIDTH)
    }
    .min(i64::from(max_width.max(1)));
    let height = if range_y > 0 {
        range_y * 2 + 1
    } else {
        i64::from(FALLBACK_VIEW_HEIGHT)
    }
    .min(i64::from(max_height.max(1)));

    let left = i64::from(map.center_x) - range_x;
    let top = i64::from(map.center_y) - range_y;
    let mut grid = vec![vec![' '; width as usize]; height as usize];

    if let Some(rows) = rows {
        for (y, row) in rows.iter().take(height as usize).enumerate() {
            for (x, cell) in row.chars().take(width as usize).enumerate() {
                grid[y][x] = cell;
            }
        }
    }

    let mut plot = |x: i32, y: i32, symbol: char| {
        let (rx, ry) = (i64::from(x) - left, i64::from(y) - top);
        if (0..width).contains(&rx) && (0..height).contains(&ry) {
            grid[ry as usize][rx as usize] = symbol;
        }
    };

    for object in state.objects.iter().filter(|o| o.z == map.center_z) {
        let symbol = match object.kind.as_str() {
            "CONTAINER" => '#',
            "EXIT" => '>',
            "BED" => '=',
            _ => '?',
        };
        plot(object.x, object.y, symbol);
    }
    for npc in state.npcs.iter().filter(|n| n.z == map.center_z) {
        let symbol = match (npc.name.is_empty(), npc.aggressive) {
            (true, _) => 'E',
            (false, true) => 'M',
            (false, false) => 'N',
        };
        plot(npc.x, npc.y, symbol);
    }
    for other in state
        .other_players
        .iter()
        .filter(|o| o.z == state.player.layer_index)
    {
        plot(other.x, other.y, 'P');
    }
    plot(state.player.x, state.player.y, '@');

    grid.into_iter().map(|row| row.into_iter().collect()).collect()
}

fn modal_panel(state: &GameState, modal: Modal) -> Vec<Line> {
    let mut lines = Vec::new();
    match modal {
        Modal::Inventory => {
            lines.push(Line::new("== INVENTORY ==", Color::Cyan));
            if state.player.inventory.is_empty() {
                lines.push(Line::new("(empty)", Color::DarkGrey));
            }
            for (i, (slot, item)) in state.player.inventory.iter().enumerate() {
                let equipped = slot.to_string() == state.player.equipped_weapon_slot
                    || slot.to_string() == state.player.equipped_mask_slot;
                let label = format!(
                    "[{}] {} x{}{}",
                    slot,
                    item.name,
                    item.quantity,
                    if equipped { " (E)" } else { "" }
                );
                lines.push(Line::new(
                    label,
                    selection_color(i == state.inventory_selection, rarity_color(&item.rarity)),
                ));
            }
            lines.push(Line::new(
                "e equip  u use  d drop  i/Esc close",
                Color::DarkGrey,
            ));
        }
        Modal::Metro => {
            lines.push(Line::new(
                format!("== METRO LINE {} ==", state.metro_ui.line_id),
                Color::Cyan,
            ));
            for (i, station) in state.metro_ui.stations.iter().enumerate() {
                lines.push(choice(&station.name, i == state.metro_selection, true));
            }
            lines.push(Line::new("Enter travel  Esc close", Color::DarkGrey));
        }
        Modal::Trade => {
            let mode = match state.trade_mode {
                TradeMode::Buy => "BUY",
                TradeMode::Sell => "SELL",
            };
            lines.push(Line::new(
                format!("== TRADE: {} [{}] ==", state.trade_ui.npc_name, mode),
                Color::Cyan,
            ));
            if !state.trade_ui.welcome_message.is_empty() {
                lines.push(Line::plain(state.trade_ui.welcome_message.clone()));
            }
            match state.trade_mode {
                TradeMode::Buy => {
                    for (i, item) in state.trade_ui.items.iter().enumerate() {
                        lines.push(choice(
                            &format!("{} - {} cr", item.name, item.price),
                            i == state.trade_selection,
                            true,
                        ));
                    }
                }
                TradeMode::Sell => {
                    for (i, (slot, item)) in state.player.inventory.iter().enumerate() {
                        lines.push(choice(
                            &format!("[{}] {} x{}", slot, item.name, item.quantity),
                            i == state.inventory_selection,
                            true,
                        ));
                    }
                }
            }
            lines.push(Line::new(
                format!("Credits: {}  s switch mode  Enter confirm  Esc close", state.player.credits),
                Color::DarkGrey,
            ));
        }
        Modal::Menu => {
            lines.push(Line::new("== MENU ==", Color::Cyan));
            for (i, entry) in ["Resume", "Help", "Exit"].iter().enumerate() {
                lines.push(choice(entry, i == state.menu_selection, true));
            }
        }
        Modal::PayDebt => {
            lines.push(Line::new("== PAY DEBT ==", Color::Cyan));
            lines.push(Line::plain(format!(
                "Debt: {}  Credits: {}",
                state.player.debt, state.player.credits
            )));
            lines.push(Line::new(
                format!("Amount: {}_", state.debt_input),
                Color::Yellow,
            ));
            lines.push(Line::new("Enter pay  Esc close", Color::DarkGrey));
        }
        Modal::Announcement => {
            lines.push(Line::new("== ANNOUNCEMENT ==", Color::Magenta));
            lines.push(Line::plain(state.announcement.clone()));
            lines.push(Line::new("Enter/Esc close", Color::DarkGrey));
        }
        Modal::Dialog => {
            lines.push(Line::new(
                format!("== {} ==", state.dialog.npc_name),
                Color::Cyan,
            ));
            lines.push(Line::plain(state.dialog.text.clone()));
            lines.push(Line::new("Enter/Esc close", Color::DarkGrey));
        }
    }
    lines
}

fn help_panel() -> Vec<Line> {
    [
        "== HELP ==",
        "Arrows   move",
        "Space    attack",
        "e        interact",
        "u        use first slot",
        "i        inventory",
        "p        pay debt",
        "l        toggle logs",
        "h        toggle help",
        "Esc      menu",
        "Ctrl+C   quit",
    ]
    .iter()
    .map(|text| Line::plain(*text))
    .collect()
}

fn rarity_color(rarity: &str) -> Color {
    match rarity {
        "UNCOMMON" => Color::Green,
        "RARE" => Color::Blue,
        "EPIC" => Color::Magenta,
        "LEGENDARY" => Color::DarkYellow,
        _ => Color::White,
    }
}

fn selection_color(selected: bool, base: Color) -> Color {
    if selected {
        Color::Yellow
    } else {
        base
    }
}
