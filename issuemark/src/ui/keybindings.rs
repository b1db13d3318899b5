//! Keybinding dispatcher for issuemark.
//!
//! Translates crossterm key and mouse events into `AppState` mutations and
//! returns a `KeyAction` for anything the event loop must do outside the
//! state: quitting, fetching, persisting the annotation switch, or loading a
//! different file.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

use crate::app::{AppState, Jump, Mode, PanelFocus};

/// Follow-up work for the event loop after a key or mouse event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Nothing beyond a redraw.
    Continue,
    Quit,
    /// Refetch issues, bypassing the cache.
    Refresh,
    /// Flip the annotation switch and persist it.
    ToggleEnabled,
    /// A sidebar entry was opened; record it and load its file if it changed.
    Opened(Jump),
}

/// Dispatches a key event to the handler for the current mode.
pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::Normal => handle_normal(key, state),
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state) {
        return action;
    }

    match key.code {
        KeyCode::Char('H') => {
            state.focus = state.focus.prev();
            KeyAction::Continue
        }
        KeyCode::Char('L') => {
            state.focus = state.focus.next();
            KeyAction::Continue
        }

        KeyCode::Enter if state.focus == PanelFocus::Sidebar => open_selected(state),

        KeyCode::Char('n') => {
            state.next_annotation();
            KeyAction::Continue
        }
        KeyCode::Char('N') => {
            state.prev_annotation();
            KeyAction::Continue
        }

        KeyCode::Char('r') => KeyAction::Refresh,
        KeyCode::Char('e') => KeyAction::ToggleEnabled,

        KeyCode::Char('<') => {
            state.shrink_source_panel();
            KeyAction::Continue
        }
        KeyCode::Char('>') => {
            state.grow_source_panel();
            KeyAction::Continue
        }

        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
            KeyAction::Continue
        }

        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,

        _ => KeyAction::Continue,
    }
}

fn open_selected(state: &mut AppState) -> KeyAction {
    if !state.enabled {
        return KeyAction::Continue;
    }
    match state.open_selected() {
        Some(jump) => KeyAction::Opened(jump),
        None => KeyAction::Continue,
    }
}

/// Handles j / k / g / G and the Ctrl page keys. `None` means the key was
/// not a scroll key.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll_up(1),
        KeyCode::Char('g') => state.scroll_top(),
        KeyCode::Char('G') => state.scroll_bottom(),
        KeyCode::Char('d') if ctrl => state.half_page_down(),
        KeyCode::Char('u') if ctrl => state.half_page_up(),
        KeyCode::Char('f') if ctrl => state.full_page_down(),
        KeyCode::Char('b') if ctrl => state.full_page_up(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

// ---------------------------------------------------------------------------
// HelpOverlay mode
// ---------------------------------------------------------------------------

/// j/k/g/G scroll the overlay; `?`, `Esc` and `q` close it.
fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') => state.help_scroll = state.help_scroll.saturating_add(1),
        KeyCode::Char('k') => state.help_scroll = state.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('G') => state.help_scroll = u16::MAX,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Mouse events
// ---------------------------------------------------------------------------

/// Click focuses a panel (and selects a sidebar entry); the wheel scrolls
/// the focused panel or the help overlay by 3 rows.
pub fn handle_mouse(mouse: MouseEvent, state: &mut AppState) -> KeyAction {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) if state.mode == Mode::Normal => {
            handle_mouse_click(mouse.column, mouse.row, state)
        }
        MouseEventKind::ScrollUp => {
            if state.mode == Mode::HelpOverlay {
                state.help_scroll = state.help_scroll.saturating_sub(3);
            } else {
                state.scroll_up(3);
            }
            KeyAction::Continue
        }
        MouseEventKind::ScrollDown => {
            if state.mode == Mode::HelpOverlay {
                state.help_scroll = state.help_scroll.saturating_add(3);
            } else {
                state.scroll_down(3);
            }
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

/// Collapsed (zero-width) panels never take focus.
///
/// Clicking an already selected sidebar entry opens it.
fn handle_mouse_click(col: u16, row: u16, state: &mut AppState) -> KeyAction {
    let pos = Position { x: col, y: row };
    let [left, center, right] = state.panel_rects;

    if left.width > 0 && left.contains(pos) {
        state.focus = PanelFocus::Sidebar;
        let list = state.sidebar_list_area;
        if list.width > 0 && list.contains(pos) {
            let clicked = state.sidebar_state.offset() + (row - list.y) as usize;
            let was_selected = state.sidebar_state.selected() == Some(clicked);
            if !state.select_row(clicked) && was_selected {
                return open_selected(state);
            }
        }
    } else if center.contains(pos) {
        state.focus = PanelFocus::Source;
    } else if right.width > 0 && right.contains(pos) {
        state.focus = PanelFocus::Details;
    }

    KeyAction::Continue
}
