//! Details panel: the selected issue with its source link stripped from the body.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
};

use issuemark_core::types::Annotation;

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

pub fn render_details(frame: &mut Frame, area: Rect, focus: PanelFocus, state: &AppState, theme: &Theme) {
    frame.render_widget(panel_block("Issue", focus == PanelFocus::Details, theme), area);
    let inner = inner_rect(area);

    let text = match state.selected_annotation() {
        Some(annotation) if state.enabled => details_text(annotation, theme),
        _ => Text::from(Line::styled("No issue selected", Style::default().fg(theme.muted))),
    };

    frame.render_widget(
        Paragraph::new(text)
            .wrap(Wrap { trim: false })
            .scroll((state.details_scroll, 0)),
        inner,
    );
}

fn details_text(annotation: &Annotation, theme: &Theme) -> Text<'static> {
    let issue = &annotation.issue;
    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!("#{} ", issue.number), Style::default().fg(theme.issue_number)),
            Span::styled(issue.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::styled(issue.link_url().to_owned(), Style::default().fg(theme.link)),
    ];
    if let Some(r) = &annotation.reference {
        let range = if r.is_single_line() {
            format!("{}:{}", r.file_path, r.start_line)
        } else {
            format!("{}:{}-{}", r.file_path, r.start_line, r.end_line)
        };
        lines.push(Line::styled(range, Style::default().fg(theme.muted)));
    }
    lines.push(Line::raw(""));

    let body = issue.display_body();
    if body.is_empty() {
        lines.push(Line::styled("(no description)", Style::default().fg(theme.muted)));
    } else {
        lines.extend(body.lines().map(|l| Line::raw(l.to_owned())));
    }
    Text::from(lines)
}
