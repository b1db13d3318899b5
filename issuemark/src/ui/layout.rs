//! Responsive 3-panel layout for issuemark.
//!
//! Pure layout arithmetic plus the shared panel chrome. Called inside
//! `terminal.draw()` on every render, so every frame reflects the current
//! terminal size.
//!
//! # Panel geometry
//!
//! | Terminal width | Layout |
//! |----------------|--------|
//! | `< 80` cols    | Source only |
//! | `80..120` cols | Sidebar + source; details collapsed |
//! | `>= 120` cols  | Sidebar / source / details using `left_pct / center_pct / right_pct` |
//!
//! `Spacing::Overlap(1)` with `MergeStrategy::Fuzzy` lets neighbouring panels
//! share one border column.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use crate::app::{AppState, Mode};
use crate::theme::Theme;

/// Returns `[left, center, right, status_bar]` for the current frame.
///
/// Collapsed panels come back with zero width.
pub fn compute_layout(frame: &Frame, state: &AppState) -> [Rect; 4] {
    let term_width = frame.area().width;

    let [main_area, status_bar] =
        frame.area().layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let constraints = if term_width >= 120 {
        [
            Constraint::Percentage(state.left_pct),
            Constraint::Percentage(state.center_pct),
            Constraint::Percentage(state.right_pct),
        ]
    } else if term_width >= 80 {
        [
            Constraint::Percentage(state.left_pct + state.right_pct / 2),
            Constraint::Fill(1),
            Constraint::Length(0),
        ]
    } else {
        [Constraint::Length(0), Constraint::Fill(1), Constraint::Length(0)]
    };
    let horizontal = Layout::horizontal(constraints).spacing(Spacing::Overlap(1));

    let [left, center, right] = main_area.layout(&horizontal);

    [left, center, right, status_bar]
}

/// The inner `Rect` of a panel after removing the 1-cell border.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Bordered block for a panel: thick and `border_active` when focused.
///
/// `MergeStrategy::Fuzzy` because `Exact` draws wrong junctions where thick
/// and plain borders meet.
pub fn panel_block<'a>(title: &'a str, is_focused: bool, theme: &'a Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// Renders the 1-row status bar: mode, repository and file, annotation
/// switch, fetch progress or error, and the issue count.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let mode_text = match state.mode {
        Mode::Normal => " NORMAL ",
        Mode::HelpOverlay => " HELP ",
    };
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let mut spans = vec![
        Span::styled(mode_text, bold.fg(theme.status_enabled)),
        Span::raw(format!(" {}", state.target.repo)),
    ];
    if let Some(file) = state.current_file() {
        spans.push(Span::raw(format!(" · {file}")));
    }

    let (switch_text, switch_fg) = if state.enabled {
        (" · annotations on", theme.status_enabled)
    } else {
        (" · annotations off", theme.status_disabled)
    };
    spans.push(Span::styled(switch_text, Style::default().fg(switch_fg)));

    if state.issues_loading {
        spans.push(Span::styled(
            format!(" · {} fetching issues", state.spinner()),
            Style::default().fg(theme.status_loading),
        ));
    } else if let Some(err) = &state.fetch_error {
        spans.push(Span::styled(format!(" · {err}"), Style::default().fg(theme.error)));
    } else if state.enabled {
        let count = state.index.annotation_count();
        let noun = if count == 1 { "issue" } else { "issues" };
        spans.push(Span::raw(format!(" · {count} {noun}")));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}
