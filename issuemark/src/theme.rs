//! Color theme system for issuemark.
//!
//! A `Theme` holds named `ratatui::style::Color` fields covering every UI surface
//! issuemark renders. Two built-in themes are provided:
//!
//! - `dark` uses ANSI 16 colors so it works on any terminal, including
//!   256-color SSH sessions with no truecolor support.
//! - `catppuccin_mocha` is the Catppuccin Mocha palette in RGB; requires truecolor.

use ratatui::style::Color;

/// All color values used across issuemark's UI surfaces.
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    /// Border color for the currently focused panel.
    pub border_active: Color,
    /// Border color for unfocused panels.
    pub border_inactive: Color,

    // Source view
    /// Line numbers in the gutter.
    pub gutter_number: Color,
    /// The marker drawn at the first line of each referenced range.
    pub gutter_marker: Color,
    /// Background of every line covered by at least one issue.
    pub line_annotated: Color,
    /// Background of the line last jumped to.
    pub line_focused: Color,

    // Sidebar and details
    /// Group header (file path or "other").
    pub group_header: Color,
    /// `#123` issue numbers.
    pub issue_number: Color,
    /// Link shown in the details panel.
    pub link: Color,
    /// Secondary text: counts, placeholders, line ranges.
    pub muted: Color,
    /// Fetch errors.
    pub error: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    /// Indicator while annotations are on.
    pub status_enabled: Color,
    /// Indicator while annotations are switched off.
    pub status_disabled: Color,
    /// Loading spinner text.
    pub status_loading: Color,

    pub background: Color,
}

impl Theme {
    /// Returns the built-in dark theme using ANSI 16 colors.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            gutter_number: Color::DarkGray,
            gutter_marker: Color::Yellow,
            line_annotated: Color::Indexed(58),
            line_focused: Color::Indexed(24),

            group_header: Color::Cyan,
            issue_number: Color::Green,
            link: Color::Blue,
            muted: Color::DarkGray,
            error: Color::Red,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_enabled: Color::Cyan,
            status_disabled: Color::Yellow,
            status_loading: Color::Magenta,

            background: Color::Reset,
        }
    }

    /// Returns the Catppuccin Mocha theme using RGB truecolor values.
    ///
    /// Palette source: <https://github.com/catppuccin/catppuccin> Mocha variant.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161);    // #a6e3a1
        let red = Color::Rgb(243, 139, 168);      // #f38ba8
        let yellow = Color::Rgb(249, 226, 175);   // #f9e2af
        let blue = Color::Rgb(137, 180, 250);     // #89b4fa
        let teal = Color::Rgb(148, 226, 213);     // #94e2d5
        let mauve = Color::Rgb(203, 166, 247);    // #cba6f7
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface0 = Color::Rgb(49, 50, 68);    // #313244
        let surface1 = Color::Rgb(69, 71, 90);    // #45475a
        let base = Color::Rgb(30, 30, 46);        // #1e1e2e
        let text = Color::Rgb(205, 214, 244);     // #cdd6f4
        let peach = Color::Rgb(250, 179, 135);    // #fab387

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            gutter_number: overlay1,
            gutter_marker: peach,
            line_annotated: surface0,
            line_focused: surface1,

            group_header: teal,
            issue_number: green,
            link: blue,
            muted: overlay1,
            error: red,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_enabled: lavender,
            status_disabled: yellow,
            status_loading: mauve,

            background: base,
        }
    }

    /// Resolves a theme name to the corresponding built-in theme.
    ///
    /// Unknown names fall back to `dark()` so a typo in config never prevents
    /// startup.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to 'dark'");
                Self::dark()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve() {
        assert_eq!(Theme::from_name("catppuccin_mocha").background, Color::Rgb(30, 30, 46));
        assert_eq!(Theme::from_name("dark").background, Color::Reset);
        assert_eq!(Theme::from_name("solarized").border_active, Theme::dark().border_active);
    }
}
