//! UI rendering for issuemark.
//!
//! `render()` is the single entry point, called from the event loop's
//! `terminal.draw()` closure. Layout arithmetic lives in `layout.rs`; each
//! panel has its own module.

mod layout;
pub mod details;
pub mod help;
pub mod keybindings;
pub mod sidebar;
pub mod source_view;

use ratatui::{Frame, style::Style, widgets::Block};

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use layout::{compute_layout, inner_rect, render_status_bar};

/// Renders one complete frame: sidebar, source, details, status bar, and the
/// help overlay on top when it is open.
///
/// Viewport heights and panel rects are written back into `state` so the next
/// keypress can size page scrolls and hit-test mouse clicks.
pub fn render(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    frame.render_widget(Block::default().style(Style::default().bg(theme.background)), frame.area());

    let [left, center, right, status_bar] = compute_layout(frame, state);

    state.sidebar_viewport_height = inner_rect(left).height;
    state.source_viewport_height = inner_rect(center).height;
    state.details_viewport_height = inner_rect(right).height;
    state.panel_rects = [left, center, right];

    let focus = state.focus;

    if left.width > 0 {
        sidebar::render_sidebar(frame, left, focus, state, theme);
    } else {
        state.sidebar_list_area = Default::default();
    }

    source_view::render_source(frame, center, focus, state, theme);

    if right.width > 0 {
        details::render_details(frame, right, focus, state, theme);
    }

    render_status_bar(frame, status_bar, state, theme);

    if state.mode == Mode::HelpOverlay {
        help::render_help_overlay(frame, theme, state.help_scroll);
    }
}
