//! Source panel renderer.
//!
//! Renders `state.decorated_lines` through a List with manual virtual
//! scrolling: only `decorated_lines[source_scroll..source_scroll + height]` are
//! materialised per frame.

use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::Line,
    widgets::{List, ListItem, Paragraph, Wrap},
};

use crate::app::{AppState, PanelFocus};
use crate::source::types::SourceOrigin;
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

pub fn render_source(frame: &mut Frame, area: Rect, focus: PanelFocus, state: &AppState, theme: &Theme) {
    let title = match (state.current_file(), &state.source_origin) {
        (Some(file), Some(SourceOrigin::Revision(rev))) => format!("{file} @ {rev}"),
        (Some(file), _) => file.to_owned(),
        (None, _) => state.target.repo.to_string(),
    };
    let block = panel_block(&title, focus == PanelFocus::Source, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);

    if let Some(msg) = placeholder(state) {
        let style = if state.source_error.is_some() {
            Style::default().fg(theme.error)
        } else {
            Style::default().fg(theme.muted)
        };
        frame.render_widget(
            Paragraph::new(Line::styled(msg, style)).wrap(Wrap { trim: true }),
            inner,
        );
        return;
    }

    let total = state.decorated_lines.len();
    let visible_start = state.source_scroll.min(total.saturating_sub(1));
    let visible_end = (visible_start + inner.height as usize).min(total);

    let items: Vec<ListItem> = state.decorated_lines[visible_start..visible_end]
        .iter()
        .map(|l| ListItem::new(l.clone()))
        .collect();
    frame.render_widget(List::new(items), inner);
}

/// Message shown instead of source text, if any.
fn placeholder(state: &AppState) -> Option<String> {
    if state.current_file().is_none() {
        return Some(format!(
            "Repository view of {}. Select an issue and press Enter to open its file.",
            state.target.repo
        ));
    }
    if state.target.workdir.is_none() {
        return Some(format!(
            "No local checkout of {}. Run issuemark inside a clone to see the source.",
            state.target.repo
        ));
    }
    if state.source_loading {
        return Some(format!("{} Loading source", state.spinner()));
    }
    if let Some(err) = &state.source_error {
        return Some(err.clone());
    }
    if state.decorated_lines.is_empty() {
        return Some("(empty file)".to_owned());
    }
    None
}
