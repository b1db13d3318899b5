//! Central application state for issuemark.
//!
//! Owns everything the renderer reads: the resolved target, highlighted source,
//! the current annotation index, sidebar selection, scroll offsets and panel
//! geometry. No drawing happens here; `ui` reads this state and `keybindings`
//! mutates it.
//!
//! Annotation decorations are tracked explicitly. [`AppState::desired_annotations`]
//! describes what the source panel should show, [`AppState::rendered`] what the
//! cached `decorated_lines` currently show, and [`AppState::sync_annotations`]
//! rebuilds the cache only when the two differ.

use std::collections::BTreeSet;

use crossbeam_channel::Sender;

use issuemark_core::fetch::FetchError;
use issuemark_core::index::build_index;
use issuemark_core::settings::AnnotationPointer;
use issuemark_core::types::{Annotation, AnnotationIndex, GroupKey, Issue};
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::ListState;

use crate::source::target::Target;
use crate::source::types::{SourceOrigin, SourcePayload, SourceRequest};
use crate::theme::Theme;

/// Marker drawn in the gutter on the first line of each referenced range.
pub const GUTTER_MARKER: &str = "● ";

/// Braille spinner shown in the status bar while a fetch or source load runs.
pub const SPINNER: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Full-screen help overlay is shown above all panels.
    HelpOverlay,
}

/// Which panel currently has keyboard focus.
///
/// Cycle order: `Sidebar` → `Source` → `Details` → `Sidebar`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    /// Left panel: issues grouped by file.
    #[default]
    Sidebar,
    /// Centre panel: the annotated source file.
    Source,
    /// Right panel: the selected issue.
    Details,
}

impl PanelFocus {
    pub fn prev(self) -> Self {
        match self {
            PanelFocus::Sidebar => PanelFocus::Details,
            PanelFocus::Source => PanelFocus::Sidebar,
            PanelFocus::Details => PanelFocus::Source,
        }
    }

    pub fn next(self) -> Self {
        match self {
            PanelFocus::Sidebar => PanelFocus::Source,
            PanelFocus::Source => PanelFocus::Details,
            PanelFocus::Details => PanelFocus::Sidebar,
        }
    }
}

/// Decorations applied to the source panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedAnnotations {
    pub enabled: bool,
    /// Lines carrying a gutter marker.
    pub icon_lines: BTreeSet<u32>,
    /// Lines with the annotated background.
    pub highlighted: BTreeSet<u32>,
    pub focus_line: Option<u32>,
    /// Bumped on every source load, so new text is always redecorated.
    pub source_generation: u64,
}

/// One row of the sidebar list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarRow {
    Header { group: usize },
    Item { group: usize, annotation: usize },
}

/// Outcome of opening a sidebar entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jump {
    pub pointer: AnnotationPointer,
    /// The target switched to another file; its source must be requested.
    pub file_changed: bool,
}

pub struct AppState {
    pub mode: Mode,
    pub focus: PanelFocus,
    pub target: Target,
    /// Global on/off switch, persisted through settings.
    pub enabled: bool,

    /// Highlighted source text without gutter, one entry per line.
    pub source_lines: Vec<Line<'static>>,
    pub source_origin: Option<SourceOrigin>,
    pub source_error: Option<String>,
    pub source_loading: bool,
    pub source_generation: u64,
    /// `source_lines` with gutter and annotation styling applied.
    pub decorated_lines: Vec<Line<'static>>,
    pub rendered: RenderedAnnotations,
    /// Index of the first visible source line.
    pub source_scroll: usize,
    /// The line last jumped to, 1-based.
    pub focus_line: Option<u32>,

    /// Issues from the latest successful fetch.
    pub issues: Vec<Issue>,
    pub index: AnnotationIndex,
    /// Generation of the most recent fetch request; older results are dropped.
    pub fetch_generation: u64,
    pub issues_loading: bool,
    /// Advanced by logic ticks while anything is loading.
    pub spinner_frame: usize,
    pub fetch_error: Option<String>,

    pub sidebar_rows: Vec<SidebarRow>,
    pub sidebar_state: ListState,
    pub details_scroll: u16,
    pub help_scroll: u16,

    /// Inner heights cached after each render for page scrolling.
    pub sidebar_viewport_height: u16,
    pub source_viewport_height: u16,
    pub details_viewport_height: u16,

    pub left_pct: u16,
    pub center_pct: u16,
    pub right_pct: u16,
    /// Outer rects of the three panels from the last render, for mouse hit tests.
    pub panel_rects: [Rect; 3],
    /// Where the sidebar list itself was drawn (below any error banner).
    pub sidebar_list_area: Rect,
}

impl AppState {
    /// State for `target` before anything has loaded.
    ///
    /// A target with a line range focuses its first line. Source is marked as
    /// loading only when there is both a file and a checkout to read it from.
    /// Panel percentages start at 25 / 50 / 25.
    pub fn new(target: Target, enabled: bool) -> Self {
        let focus_line = target.lines.map(|(start, _)| start);
        let source_loading = target.file_path.is_some() && target.workdir.is_some();
        Self {
            mode: Mode::default(),
            focus: PanelFocus::default(),
            target,
            enabled,
            source_lines: Vec::new(),
            source_origin: None,
            source_error: None,
            source_loading,
            source_generation: 0,
            decorated_lines: Vec::new(),
            rendered: RenderedAnnotations::default(),
            source_scroll: 0,
            focus_line,
            issues: Vec::new(),
            index: AnnotationIndex::default(),
            fetch_generation: 0,
            issues_loading: false,
            spinner_frame: 0,
            fetch_error: None,
            sidebar_rows: Vec::new(),
            sidebar_state: ListState::default(),
            details_scroll: 0,
            help_scroll: 0,
            sidebar_viewport_height: 0,
            source_viewport_height: 0,
            details_viewport_height: 0,
            left_pct: 25,
            center_pct: 50,
            right_pct: 25,
            panel_rects: [Rect::default(); 3],
            sidebar_list_area: Rect::default(),
        }
    }

    /// Repository-relative path of the open file; `None` in repository view.
    pub fn current_file(&self) -> Option<&str> {
        self.target.file_path.as_deref()
    }

    /// Logic tick: animates the spinner while issues or source are loading.
    /// Returns whether the frame changed.
    pub fn on_tick(&mut self) -> bool {
        if !self.issues_loading && !self.source_loading {
            return false;
        }
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER.len();
        true
    }

    /// Current spinner glyph for the status bar and source placeholder.
    pub fn spinner(&self) -> &'static str {
        SPINNER[self.spinner_frame % SPINNER.len()]
    }

    /// Asks the source worker for the current file.
    ///
    /// Without a worker (no local checkout) or without a file there is nothing
    /// to load. If the worker has gone away the request cannot be delivered,
    /// so loading ends with an error instead of waiting forever.
    pub fn request_source(&mut self, tx: Option<&Sender<SourceRequest>>) {
        let (Some(tx), Some(path)) = (tx, self.current_file()) else {
            return;
        };
        let request = SourceRequest::Load {
            path: path.to_owned(),
            git_ref: self.target.git_ref.clone(),
        };
        if let Err(e) = tx.send(request) {
            tracing::error!(error = %e, "source worker is gone");
            self.source_loading = false;
            self.source_error = Some("Source worker stopped; the file cannot be loaded.".to_owned());
        }
    }

    // ---------------------------------------------------------------------
    // Issues
    // ---------------------------------------------------------------------

    /// Starts a new fetch generation and returns it.
    pub fn begin_fetch(&mut self) -> u64 {
        self.fetch_generation += 1;
        self.issues_loading = true;
        self.fetch_generation
    }

    /// Applies a fetch outcome. Returns `false` when `generation` is stale.
    ///
    /// A refresh can overtake an earlier cache read, so only the result of the
    /// most recent [`AppState::begin_fetch`] is applied. On error the previous
    /// issues and index are kept as they are and the message is stored for
    /// the status bar and sidebar.
    pub fn apply_issues(&mut self, generation: u64, result: Result<Vec<Issue>, FetchError>) -> bool {
        if generation != self.fetch_generation {
            tracing::debug!(generation, current = self.fetch_generation, "dropping stale issue result");
            return false;
        }
        self.issues_loading = false;
        match result {
            Ok(issues) => {
                self.issues = issues;
                self.fetch_error = None;
                self.rebuild_index();
            }
            Err(e) => self.fetch_error = Some(e.to_string()),
        }
        true
    }

    /// Recomputes the index for the current file and the sidebar rows.
    pub fn rebuild_index(&mut self) {
        let selected = self.selected_annotation().map(|a| a.issue.number);
        self.index = build_index(&self.issues, self.current_file());

        self.sidebar_rows.clear();
        for (g, group) in self.index.groups.iter().enumerate() {
            self.sidebar_rows.push(SidebarRow::Header { group: g });
            for a in 0..group.annotations.len() {
                self.sidebar_rows.push(SidebarRow::Item { group: g, annotation: a });
            }
        }

        let restored = selected.and_then(|number| {
            self.sidebar_rows.iter().position(|row| {
                self.annotation_for(*row).is_some_and(|a| a.issue.number == number)
            })
        });
        let row = restored.or_else(|| self.item_rows().next());
        self.sidebar_state.select(row);
        self.details_scroll = 0;
    }

    // ---------------------------------------------------------------------
    // Source
    // ---------------------------------------------------------------------

    /// Stores highlighted text for the current file. Payloads for any other
    /// path are ignored.
    pub fn apply_source(&mut self, payload: SourcePayload) -> bool {
        if self.current_file() != Some(payload.path.as_str()) {
            return false;
        }
        self.source_lines = payload.lines;
        self.source_origin = payload.origin;
        self.source_error = payload.error;
        self.source_loading = false;
        self.source_generation += 1;
        match self.focus_line {
            Some(line) => self.scroll_to_line(line),
            None => self.source_scroll = 0,
        }
        true
    }

    /// Flips the in-memory switch. The caller persists it through settings;
    /// decorations follow on the next [`AppState::sync_annotations`].
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// What the source panel should currently show.
    pub fn desired_annotations(&self) -> RenderedAnnotations {
        let (icon_lines, highlighted): (BTreeSet<u32>, BTreeSet<u32>) = if self.enabled {
            (
                self.index.icon_lines.clone(),
                self.index.line_to_issues.keys().copied().collect(),
            )
        } else {
            Default::default()
        };
        RenderedAnnotations {
            enabled: self.enabled,
            icon_lines,
            highlighted,
            focus_line: self.focus_line,
            source_generation: self.source_generation,
        }
    }

    /// Rebuilds `decorated_lines` if the desired decorations differ from the
    /// rendered ones. Returns whether anything was rebuilt.
    ///
    /// Called before every draw. Decorating clones every span of the file, so
    /// frames where nothing changed must not pay for it.
    pub fn sync_annotations(&mut self, theme: &Theme) -> bool {
        let desired = self.desired_annotations();
        if desired == self.rendered {
            return false;
        }

        let width = self.source_lines.len().max(1).to_string().len();
        self.decorated_lines = self
            .source_lines
            .iter()
            .enumerate()
            .map(|(i, line)| decorate_line(i as u32 + 1, line, width, &desired, theme))
            .collect();
        self.rendered = desired;
        true
    }

    // ---------------------------------------------------------------------
    // Sidebar
    // ---------------------------------------------------------------------

    fn item_rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.sidebar_rows
            .iter()
            .enumerate()
            .filter(|(_, row)| matches!(row, SidebarRow::Item { .. }))
            .map(|(i, _)| i)
    }

    /// The annotation behind a sidebar row; headers have none.
    pub fn annotation_for(&self, row: SidebarRow) -> Option<&Annotation> {
        match row {
            SidebarRow::Item { group, annotation } => {
                self.index.groups.get(group)?.annotations.get(annotation)
            }
            SidebarRow::Header { .. } => None,
        }
    }

    /// The annotation shown in the details panel.
    pub fn selected_annotation(&self) -> Option<&Annotation> {
        let row = *self.sidebar_rows.get(self.sidebar_state.selected()?)?;
        self.annotation_for(row)
    }

    /// Moves the sidebar selection by `delta` entries, skipping group headers.
    pub fn move_selection(&mut self, delta: isize) {
        let items: Vec<usize> = self.item_rows().collect();
        if items.is_empty() {
            return;
        }
        let current = self
            .sidebar_state
            .selected()
            .and_then(|row| items.iter().position(|&i| i >= row))
            .unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(items.len() - 1);
        self.sidebar_state.select(Some(items[next]));
        self.details_scroll = 0;
    }

    /// Selects the sidebar row at `row` if it is an entry. Returns whether
    /// the selection changed.
    pub fn select_row(&mut self, row: usize) -> bool {
        let is_item = matches!(self.sidebar_rows.get(row), Some(SidebarRow::Item { .. }));
        if !is_item || self.sidebar_state.selected() == Some(row) {
            return false;
        }
        self.sidebar_state.select(Some(row));
        self.details_scroll = 0;
        true
    }

    fn select_first_item(&mut self) {
        let first = self.item_rows().next();
        self.sidebar_state.select(first);
    }

    fn select_last_item(&mut self) {
        let last = self.item_rows().last();
        self.sidebar_state.select(last);
    }

    /// Opens the selected sidebar entry.
    ///
    /// An entry in the current file moves the source view to its first line.
    /// An entry in another file retargets the viewer to that file. Entries
    /// without a reference have nowhere to go and return `None`.
    pub fn open_selected(&mut self) -> Option<Jump> {
        let annotation = self.selected_annotation()?;
        let reference = annotation.reference.clone()?;
        let number = annotation.issue.number;

        let file_changed = self.current_file() != Some(reference.file_path.as_str());
        if file_changed {
            self.target.file_path = Some(reference.file_path.clone());
            self.source_lines.clear();
            self.source_origin = None;
            self.source_error = None;
            self.source_loading = self.target.workdir.is_some();
            self.source_generation += 1;
            self.rebuild_index();
        }

        self.focus_line = Some(reference.start_line);
        self.scroll_to_line(reference.start_line);
        self.focus = PanelFocus::Source;

        Some(Jump {
            pointer: AnnotationPointer {
                owner: self.target.repo.owner.clone(),
                repo: self.target.repo.repo.clone(),
                issue_number: number,
                file_path: reference.file_path,
                line: reference.start_line,
            },
            file_changed,
        })
    }

    /// Restores a previously opened annotation if it belongs to this file.
    pub fn restore_pointer(&mut self, pointer: &AnnotationPointer) -> bool {
        let Some(file) = self.current_file() else {
            return false;
        };
        if !pointer.points_into(&self.target.repo.owner, &self.target.repo.repo, file) {
            return false;
        }
        self.focus_line = Some(pointer.line);
        self.scroll_to_line(pointer.line);
        true
    }

    // ---------------------------------------------------------------------
    // Annotation navigation
    // ---------------------------------------------------------------------

    fn anchor_line(&self) -> u32 {
        self.focus_line.unwrap_or(self.source_scroll as u32 + 1)
    }

    /// Jumps to the next annotated range below the anchor line.
    pub fn next_annotation(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        match self.index.next_icon_line(self.anchor_line()) {
            Some(line) => {
                self.jump_to_marker(line);
                true
            }
            None => false,
        }
    }

    /// Jumps to the previous annotated range above the anchor line.
    pub fn prev_annotation(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        match self.index.prev_icon_line(self.anchor_line()) {
            Some(line) => {
                self.jump_to_marker(line);
                true
            }
            None => false,
        }
    }

    fn jump_to_marker(&mut self, line: u32) {
        self.focus_line = Some(line);
        self.scroll_to_line(line);

        let current = self.current_file().map(|f| GroupKey::File(f.to_owned()));
        let row = self.sidebar_rows.iter().position(|&row| match row {
            SidebarRow::Item { group, .. } => {
                Some(&self.index.groups[group].key) == current.as_ref()
                    && self
                        .annotation_for(row)
                        .and_then(|a| a.reference.as_ref())
                        .is_some_and(|r| r.start_line == line)
            }
            SidebarRow::Header { .. } => false,
        });
        if let Some(row) = row {
            self.sidebar_state.select(Some(row));
            self.details_scroll = 0;
        }
    }

    /// Scrolls so `line` sits a third of the way down the viewport.
    pub fn scroll_to_line(&mut self, line: u32) {
        let context = (self.source_viewport_height / 3) as usize;
        let index = (line as usize).saturating_sub(1);
        self.source_scroll = index.saturating_sub(context);
        self.clamp_source_scroll();
    }

    fn clamp_source_scroll(&mut self) {
        if !self.source_lines.is_empty() {
            self.source_scroll = self.source_scroll.min(self.source_lines.len() - 1);
        }
    }

    // ---------------------------------------------------------------------
    // Scrolling
    // ---------------------------------------------------------------------

    /// Scrolls the focused panel. In the sidebar this moves the selection
    /// instead, skipping group headers.
    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::Sidebar => self.move_selection(lines as isize),
            PanelFocus::Source => {
                self.source_scroll = self.source_scroll.saturating_add(lines as usize);
                self.clamp_source_scroll();
            }
            PanelFocus::Details => {
                self.details_scroll = self.details_scroll.saturating_add(lines);
            }
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::Sidebar => self.move_selection(-(lines as isize)),
            PanelFocus::Source => {
                self.source_scroll = self.source_scroll.saturating_sub(lines as usize);
            }
            PanelFocus::Details => {
                self.details_scroll = self.details_scroll.saturating_sub(lines);
            }
        }
    }

    pub fn scroll_top(&mut self) {
        match self.focus {
            PanelFocus::Sidebar => self.select_first_item(),
            PanelFocus::Source => self.source_scroll = 0,
            PanelFocus::Details => self.details_scroll = 0,
        }
    }

    /// Jumps to the end of the focused panel.
    pub fn scroll_bottom(&mut self) {
        match self.focus {
            PanelFocus::Sidebar => self.select_last_item(),
            PanelFocus::Source => self.source_scroll = self.source_lines.len().saturating_sub(1),
            PanelFocus::Details => self.details_scroll = u16::MAX,
        }
    }

    fn focused_viewport_height(&self) -> u16 {
        match self.focus {
            PanelFocus::Sidebar => self.sidebar_viewport_height,
            PanelFocus::Source => self.source_viewport_height,
            PanelFocus::Details => self.details_viewport_height,
        }
    }

    /// Scrolls by half the focused panel's height (at least one row).
    pub fn half_page_down(&mut self) {
        self.scroll_down((self.focused_viewport_height() / 2).max(1));
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.focused_viewport_height() / 2).max(1));
    }

    pub fn full_page_down(&mut self) {
        self.scroll_down(self.focused_viewport_height().max(1));
    }

    pub fn full_page_up(&mut self) {
        self.scroll_up(self.focused_viewport_height().max(1));
    }

    // ---------------------------------------------------------------------
    // Panel geometry
    // ---------------------------------------------------------------------

    /// Shrinks the source panel by 5%, split between the side panels.
    /// The source panel never drops below 20%.
    pub fn shrink_source_panel(&mut self) {
        const MIN_CENTER: u16 = 20;
        const STEP: u16 = 5;
        if self.center_pct <= MIN_CENTER {
            return;
        }
        let transfer = STEP.min(self.center_pct - MIN_CENTER);
        self.center_pct -= transfer;
        let left_gain = transfer / 2;
        let right_gain = transfer - left_gain;
        self.left_pct = self.left_pct.saturating_add(left_gain);
        self.right_pct = self.right_pct.saturating_add(right_gain);
    }

    /// Grows the source panel by up to 5% taken from the side panels.
    /// The source panel never exceeds 80% and side panels keep at least 5%.
    pub fn grow_source_panel(&mut self) {
        const MAX_CENTER: u16 = 80;
        const MIN_SIDE: u16 = 5;
        const STEP: u16 = 5;
        if self.center_pct >= MAX_CENTER {
            return;
        }
        let transfer = STEP.min(MAX_CENTER - self.center_pct);
        let left_give = (transfer / 2).min(self.left_pct.saturating_sub(MIN_SIDE));
        let right_give = (transfer - transfer / 2).min(self.right_pct.saturating_sub(MIN_SIDE));
        self.left_pct -= left_give;
        self.right_pct -= right_give;
        self.center_pct += left_give + right_give;
    }
}

/// Adds the gutter (line number and marker) and the line background.
fn decorate_line(
    number: u32,
    line: &Line<'static>,
    width: usize,
    decorations: &RenderedAnnotations,
    theme: &Theme,
) -> Line<'static> {
    let marker = if decorations.icon_lines.contains(&number) {
        Span::styled(GUTTER_MARKER, Style::default().fg(theme.gutter_marker))
    } else {
        Span::raw("  ")
    };

    let mut spans = Vec::with_capacity(line.spans.len() + 2);
    spans.push(Span::styled(
        format!("{number:>width$} "),
        Style::default().fg(theme.gutter_number),
    ));
    spans.push(marker);
    spans.extend(line.spans.iter().cloned());

    let style = if decorations.focus_line == Some(number) {
        Style::default().bg(theme.line_focused)
    } else if decorations.highlighted.contains(&number) {
        Style::default().bg(theme.line_annotated)
    } else {
        Style::default()
    };
    Line::from(spans).style(style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuemark_core::types::{IssueState, RepoId};

    fn target(file: Option<&str>) -> Target {
        Target {
            repo: RepoId::new("o", "r"),
            file_path: file.map(str::to_owned),
            git_ref: None,
            lines: None,
            workdir: Some("/tmp/checkout".into()),
        }
    }

    fn issue(number: u64, body: &str) -> Issue {
        Issue {
            number,
            title: format!("issue {number}"),
            body: Some(body.to_owned()),
            state: IssueState::Open,
            html_url: format!("https://github.com/o/r/issues/{number}"),
            is_pull_request: false,
        }
    }

    fn sample_issues() -> Vec<Issue> {
        vec![
            issue(1, "https://github.com/o/r/blob/main/a.rs#L10-L12"),
            issue(2, "https://github.com/o/r/blob/main/a.rs#L3"),
            issue(3, "https://github.com/o/r/blob/main/b.rs#L1"),
            issue(4, "no reference"),
        ]
    }

    fn source(n: usize) -> SourcePayload {
        SourcePayload {
            path: "a.rs".into(),
            origin: Some(SourceOrigin::WorkingTree),
            lines: (1..=n).map(|i| Line::raw(format!("line {i}"))).collect(),
            error: None,
        }
    }

    fn loaded_state() -> AppState {
        let mut state = AppState::new(target(Some("a.rs")), true);
        state.source_viewport_height = 9;
        assert!(state.apply_source(source(40)));
        let generation = state.begin_fetch();
        assert!(state.apply_issues(generation, Ok(sample_issues())));
        state
    }

    #[test]
    fn panel_focus_cycles() {
        let f = PanelFocus::Sidebar;
        assert_eq!(f.next().next().next(), f);
        assert_eq!(f.prev(), PanelFocus::Details);
    }

    #[test]
    fn stale_fetch_results_are_ignored() {
        let mut state = AppState::new(target(Some("a.rs")), true);
        let old = state.begin_fetch();
        let new = state.begin_fetch();
        assert!(!state.apply_issues(old, Ok(sample_issues())));
        assert!(state.issues.is_empty());
        assert!(state.issues_loading);
        assert!(state.apply_issues(new, Ok(vec![])));
        assert!(!state.issues_loading);
    }

    #[test]
    fn fetch_error_keeps_previous_annotations() {
        let mut state = loaded_state();
        let before = state.index.clone();
        let generation = state.begin_fetch();
        state.apply_issues(generation, Err(FetchError::RateLimited));
        assert_eq!(state.index, before);
        assert_eq!(
            state.fetch_error.as_deref(),
            Some("Rate limit exceeded. Please try again later.")
        );

        let generation = state.begin_fetch();
        state.apply_issues(generation, Ok(vec![]));
        assert!(state.fetch_error.is_none());
        assert_eq!(state.index.annotation_count(), 0);
    }

    #[test]
    fn sidebar_rows_have_headers_and_skip_them() {
        let state = loaded_state();
        // a.rs header + 2, b.rs header + 1, other header + 1
        assert_eq!(state.sidebar_rows.len(), 7);
        assert_eq!(state.sidebar_state.selected(), Some(1));
        assert_eq!(state.selected_annotation().unwrap().issue.number, 2);

        let mut state = state;
        state.move_selection(1);
        assert_eq!(state.selected_annotation().unwrap().issue.number, 1);
        state.move_selection(1);
        assert_eq!(state.sidebar_state.selected(), Some(4));
        assert_eq!(state.selected_annotation().unwrap().issue.number, 3);
        state.move_selection(10);
        assert_eq!(state.selected_annotation().unwrap().issue.number, 4);
        state.move_selection(-10);
        assert_eq!(state.selected_annotation().unwrap().issue.number, 2);
    }

    #[test]
    fn select_row_ignores_headers() {
        let mut state = loaded_state();
        assert!(!state.select_row(0));
        assert!(!state.select_row(1), "already selected");
        assert!(state.select_row(4));
        assert_eq!(state.selected_annotation().unwrap().issue.number, 3);
        assert!(!state.select_row(99));
    }

    #[test]
    fn selection_survives_refetch() {
        let mut state = loaded_state();
        state.move_selection(2);
        assert_eq!(state.selected_annotation().unwrap().issue.number, 3);

        let generation = state.begin_fetch();
        let mut issues = sample_issues();
        issues.insert(0, issue(9, "https://github.com/o/r/blob/main/a.rs#L1"));
        state.apply_issues(generation, Ok(issues));
        assert_eq!(state.selected_annotation().unwrap().issue.number, 3);
    }

    #[test]
    fn decorations_rebuild_only_on_change() {
        let theme = Theme::dark();
        let mut state = loaded_state();
        assert!(state.sync_annotations(&theme));
        assert!(!state.sync_annotations(&theme));
        assert_eq!(state.decorated_lines.len(), 40);

        let marked = &state.decorated_lines[2];
        assert_eq!(marked.spans[1].content, GUTTER_MARKER);
        assert_eq!(marked.style.bg, Some(theme.line_annotated));
        let covered = &state.decorated_lines[10];
        assert_eq!(covered.spans[1].content, "  ");
        assert_eq!(covered.style.bg, Some(theme.line_annotated));
        assert_eq!(state.decorated_lines[12].style.bg, None);
        assert_eq!(state.decorated_lines[0].spans[0].content, " 1 ");

        state.set_enabled(false);
        assert!(state.sync_annotations(&theme));
        assert!(state.decorated_lines.iter().all(|l| l.style.bg.is_none()));
        assert!(state.decorated_lines.iter().all(|l| l.spans[1].content == "  "));
    }

    #[test]
    fn next_and_prev_walk_markers_and_sync_sidebar() {
        let mut state = loaded_state();
        assert!(state.next_annotation());
        assert_eq!(state.focus_line, Some(3));
        assert_eq!(state.selected_annotation().unwrap().issue.number, 2);
        assert!(state.next_annotation());
        assert_eq!(state.focus_line, Some(10));
        assert_eq!(state.selected_annotation().unwrap().issue.number, 1);
        assert_eq!(state.source_scroll, 9 - 3);
        assert!(!state.next_annotation());
        assert!(state.prev_annotation());
        assert_eq!(state.focus_line, Some(3));
        assert!(!state.prev_annotation());

        state.set_enabled(false);
        assert!(!state.next_annotation());
    }

    #[test]
    fn open_in_current_file_jumps() {
        let mut state = loaded_state();
        state.move_selection(1);
        let jump = state.open_selected().unwrap();
        assert!(!jump.file_changed);
        assert_eq!(jump.pointer.issue_number, 1);
        assert_eq!(jump.pointer.line, 10);
        assert_eq!(jump.pointer.file_path, "a.rs");
        assert_eq!(state.focus_line, Some(10));
        assert_eq!(state.focus, PanelFocus::Source);
    }

    #[test]
    fn open_in_other_file_retargets() {
        let mut state = loaded_state();
        state.move_selection(2);
        let jump = state.open_selected().unwrap();
        assert!(jump.file_changed);
        assert_eq!(state.current_file(), Some("b.rs"));
        assert!(state.source_lines.is_empty());
        assert!(state.source_loading);
        assert_eq!(state.index.groups[0].key, GroupKey::File("b.rs".into()));
        assert_eq!(state.index.icon_lines.iter().copied().collect::<Vec<_>>(), vec![1]);
        // Selection followed the issue into its new row
        assert_eq!(state.selected_annotation().unwrap().issue.number, 3);

        // Stale payload for the old file is ignored
        assert!(!state.apply_source(source(5)));
    }

    #[test]
    fn unreferenced_entry_cannot_be_opened() {
        let mut state = loaded_state();
        state.move_selection(3);
        assert_eq!(state.selected_annotation().unwrap().issue.number, 4);
        assert!(state.open_selected().is_none());
    }

    #[test]
    fn restore_pointer_only_for_same_file() {
        let mut state = loaded_state();
        let mut ptr = AnnotationPointer {
            owner: "o".into(),
            repo: "r".into(),
            issue_number: 1,
            file_path: "a.rs".into(),
            line: 30,
        };
        assert!(state.restore_pointer(&ptr));
        assert_eq!(state.focus_line, Some(30));
        ptr.file_path = "b.rs".into();
        ptr.line = 2;
        assert!(!state.restore_pointer(&ptr));
        assert_eq!(state.focus_line, Some(30));
    }

    #[test]
    fn repository_view_has_no_line_map() {
        let mut state = AppState::new(target(None), true);
        assert!(!state.source_loading);
        let generation = state.begin_fetch();
        state.apply_issues(generation, Ok(sample_issues()));
        assert!(state.index.icon_lines.is_empty());
        assert_eq!(state.index.annotation_count(), 4);
        assert!(!state.next_annotation());
    }

    #[test]
    fn scrolling_is_clamped() {
        let mut state = loaded_state();
        state.focus = PanelFocus::Source;
        state.scroll_down(100);
        assert_eq!(state.source_scroll, 39);
        state.scroll_up(500);
        assert_eq!(state.source_scroll, 0);
        state.scroll_bottom();
        assert_eq!(state.source_scroll, 39);
        state.half_page_up();
        assert_eq!(state.source_scroll, 35);
    }

    #[test]
    fn panel_resize_limits() {
        let mut state = AppState::new(target(None), true);
        for _ in 0..20 {
            state.grow_source_panel();
        }
        assert_eq!(state.center_pct, 80);
        assert_eq!(state.left_pct + state.center_pct + state.right_pct, 100);
        for _ in 0..20 {
            state.shrink_source_panel();
        }
        assert_eq!(state.center_pct, 20);
        assert_eq!(state.left_pct + state.center_pct + state.right_pct, 100);
    }

    #[test]
    fn source_request_goes_to_worker() {
        let mut state = AppState::new(target(Some("a.rs")), true);
        let (tx, rx) = crossbeam_channel::unbounded();
        state.request_source(Some(&tx));

        let SourceRequest::Load { path, git_ref } = rx.try_recv().unwrap();
        assert_eq!(path, "a.rs");
        assert_eq!(git_ref, None);
        assert!(state.source_loading);
        assert!(state.source_error.is_none());
    }

    #[test]
    fn dead_source_worker_ends_loading_with_error() {
        let mut state = AppState::new(target(Some("a.rs")), true);
        assert!(state.source_loading);
        let (tx, rx) = crossbeam_channel::unbounded::<SourceRequest>();
        drop(rx);

        state.request_source(Some(&tx));
        assert!(!state.source_loading);
        assert!(state.source_error.is_some());
    }

    #[test]
    fn no_worker_means_no_request() {
        let mut state = AppState::new(target(None), true);
        state.request_source(None);
        assert!(state.source_error.is_none());
    }

    #[test]
    fn tick_spins_only_while_loading() {
        let mut state = loaded_state();
        assert!(!state.on_tick());
        assert_eq!(state.spinner_frame, 0);

        state.begin_fetch();
        assert!(state.on_tick());
        assert_eq!(state.spinner(), SPINNER[1]);
        for _ in 0..SPINNER.len() {
            state.on_tick();
        }
        assert_eq!(state.spinner_frame, 1);
    }
}
