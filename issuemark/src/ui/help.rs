//! Help overlay: a centred modal drawn over the panels.
//!
//! `Clear` erases the area first, so the overlay needs no second draw call.

use ratatui::{
    Frame,
    layout::Constraint,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::theme::Theme;

/// Renders the keybinding reference, scrolled by `help_scroll` rows.
///
/// Skipped below 40 columns, where the modal would have no usable width.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 40 {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));

    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Keys · j/k scroll · ? or Esc to close ")
        .border_style(ratatui::style::Style::default().fg(theme.border_active));

    let help_text = build_help_text();

    frame.render_widget(
        Paragraph::new(help_text)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

/// Keybinding descriptions grouped by section, unstyled.
fn build_help_text() -> Text<'static> {
    Text::from(vec![
        Line::from("Navigation"),
        Line::from("  j / k         Scroll down / up (sidebar: next / previous issue)"),
        Line::from("  g / G         Jump to top / bottom"),
        Line::from("  Ctrl-d / u    Scroll half page down / up"),
        Line::from("  Ctrl-f / b    Scroll full page down / up"),
        Line::from("  H / L         Move panel focus left / right"),
        Line::from(""),
        Line::from("Annotations"),
        Line::from("  Enter         Open the selected issue at its line (sidebar)"),
        Line::from("  n / N         Next / previous annotated line"),
        Line::from("  e             Turn annotations on / off (remembered)"),
        Line::from("  r             Refresh issues, bypassing the cache"),
        Line::from(""),
        Line::from("Layout"),
        Line::from("  < / >         Shrink / grow the source panel by 5%"),
        Line::from("  mouse         Click to focus or select, wheel to scroll"),
        Line::from(""),
        Line::from("General"),
        Line::from("  j / k         Scroll this help overlay"),
        Line::from("  ?             Open / close this help overlay"),
        Line::from("  q / Esc       Quit"),
    ])
}
