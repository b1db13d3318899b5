//! Comments sidebar: issues grouped by referenced file.
//!
//! Group order and in-group order come straight from the annotation index:
//! the current file first, other files alphabetically, unreferenced issues in
//! the trailing "other" group.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph, Wrap},
};

use crate::app::{AppState, PanelFocus, SidebarRow};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

/// Renders the sidebar and records where its list landed for mouse hits.
pub fn render_sidebar(
    frame: &mut Frame,
    area: Rect,
    focus: PanelFocus,
    state: &mut AppState,
    theme: &Theme,
) {
    let count = state.index.annotation_count();
    let title = if state.enabled && count > 0 {
        format!("Comments ({count})")
    } else {
        "Comments".to_owned()
    };
    frame.render_widget(panel_block(&title, focus == PanelFocus::Sidebar, theme), area);
    let inner = inner_rect(area);

    if !state.enabled {
        state.sidebar_list_area = Rect::default();
        frame.render_widget(
            Paragraph::new(Line::styled(
                "Annotations are off. Press e to turn them on.",
                Style::default().fg(theme.muted),
            ))
            .wrap(Wrap { trim: true }),
            inner,
        );
        return;
    }

    let list_area = match &state.fetch_error {
        Some(err) => {
            let [banner, rest] =
                inner.layout(&Layout::vertical([Constraint::Length(2), Constraint::Fill(1)]));
            frame.render_widget(
                Paragraph::new(Line::styled(err.as_str(), Style::default().fg(theme.error)))
                    .wrap(Wrap { trim: true }),
                banner,
            );
            rest
        }
        None => inner,
    };
    state.sidebar_list_area = list_area;

    if state.sidebar_rows.is_empty() {
        let msg = if state.issues_loading { "Loading issues…" } else { "No open issues" };
        frame.render_widget(
            Paragraph::new(Line::styled(msg, Style::default().fg(theme.muted))),
            list_area,
        );
        return;
    }

    let items: Vec<ListItem> = state
        .sidebar_rows
        .iter()
        .map(|&row| row_item(state, row, theme))
        .collect();
    let list = List::new(items)
        .highlight_style(Style::default().fg(theme.border_active).add_modifier(Modifier::REVERSED));

    frame.render_stateful_widget(list, list_area, &mut state.sidebar_state);
}

fn row_item(state: &AppState, row: SidebarRow, theme: &Theme) -> ListItem<'static> {
    match row {
        SidebarRow::Header { group } => {
            let group = &state.index.groups[group];
            ListItem::new(Line::from(vec![
                Span::styled(
                    group.key.as_str().to_owned(),
                    Style::default().fg(theme.group_header).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" ({})", group.annotations.len()),
                    Style::default().fg(theme.muted),
                ),
            ]))
        }
        SidebarRow::Item { .. } => {
            let Some(annotation) = state.annotation_for(row) else {
                return ListItem::new(Line::raw(""));
            };
            let mut spans = vec![
                Span::styled(
                    format!("  #{} ", annotation.issue.number),
                    Style::default().fg(theme.issue_number),
                ),
                Span::raw(annotation.issue.title.clone()),
            ];
            if let Some(r) = &annotation.reference {
                let range = if r.is_single_line() {
                    format!("  L{}", r.start_line)
                } else {
                    format!("  L{}-{}", r.start_line, r.end_line)
                };
                spans.push(Span::styled(range, Style::default().fg(theme.muted)));
            }
            ListItem::new(Line::from(spans))
        }
    }
}
