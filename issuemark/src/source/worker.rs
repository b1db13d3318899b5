//! Background thread that owns git2::Repository for its lifetime.
//!
//! git2::Repository is !Send, so it is opened inside the thread, not passed in.
//! All communication is via channels: SourceRequest in, AppEvent::SourceLoaded out.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crossbeam_channel::Receiver;
use git2::Repository;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use tokio::sync::mpsc::UnboundedSender;

use crate::event::AppEvent;
use crate::source::types::{SourceOrigin, SourcePayload, SourceRequest};

static PS: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static TS: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Files larger than this are shown unhighlighted.
const HIGHLIGHT_LIMIT: usize = 2 * 1024 * 1024;

/// Entry point for the background thread serving source text for `workdir`.
///
/// Loops over incoming requests until the channel is closed (sender dropped).
/// A workdir that is not a repository still serves working-tree files.
pub fn source_worker_loop(
    workdir: PathBuf,
    rx: Receiver<SourceRequest>,
    event_tx: UnboundedSender<AppEvent>,
) {
    let _ = &*PS;
    let _ = &*TS;

    let repo = match Repository::open(&workdir) {
        Ok(r) => Some(r),
        Err(e) => {
            tracing::warn!(path = %workdir.display(), error = %e, "no git repository, working tree only");
            None
        }
    };

    for request in rx {
        let payload = handle_request(&workdir, repo.as_ref(), request);
        if event_tx.send(AppEvent::SourceLoaded(Box::new(payload))).is_err() {
            break;
        }
    }
}

fn handle_request(workdir: &Path, repo: Option<&Repository>, request: SourceRequest) -> SourcePayload {
    let SourceRequest::Load { path, git_ref } = request;

    match read_source(workdir, repo, &path, git_ref.as_deref()) {
        Ok((origin, text)) => {
            let lines = highlight_source(&text, file_ext(&path));
            tracing::debug!(path = %path, lines = lines.len(), ?origin, "source loaded");
            SourcePayload { path, origin: Some(origin), lines, error: None }
        }
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "source unavailable");
            SourcePayload { path, origin: None, lines: Vec::new(), error: Some(e) }
        }
    }
}

/// Reads `path` at `git_ref` if given, else from the working tree, else at `HEAD`.
fn read_source(
    workdir: &Path,
    repo: Option<&Repository>,
    path: &str,
    git_ref: Option<&str>,
) -> Result<(SourceOrigin, String), String> {
    if let (Some(repo), Some(rev)) = (repo, git_ref) {
        match blob_text(repo, rev, path) {
            Ok(text) => return Ok((SourceOrigin::Revision(rev.to_owned()), text)),
            Err(e) => tracing::debug!(rev, path, error = %e, "revision not available locally"),
        }
    }

    match std::fs::read(workdir.join(path)) {
        Ok(bytes) => return Ok((SourceOrigin::WorkingTree, String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if repo.is_none() => return Err(format!("{path}: {e}")),
        Err(_) => {}
    }

    match repo.map(|r| blob_text(r, "HEAD", path)) {
        Some(Ok(text)) => Ok((SourceOrigin::Revision("HEAD".to_owned()), text)),
        Some(Err(e)) => Err(format!("{path}: {}", e.message())),
        None => Err(format!("{path}: not found")),
    }
}

fn blob_text(repo: &Repository, rev: &str, path: &str) -> Result<String, git2::Error> {
    let blob = repo.revparse_single(&format!("{rev}:{path}"))?.peel_to_blob()?;
    Ok(String::from_utf8_lossy(blob.content()).into_owned())
}

/// Converts a syntect (Style, &str) pair to an owned ratatui Span.
///
/// Only foreground and font style are carried over; the background is left
/// unset so annotation highlighting on the line shows through.
fn syntect_to_span(style: syntect::highlighting::Style, content: &str) -> Span<'static> {
    use syntect::highlighting::FontStyle;

    let mut ratatui_style = Style::default();
    let fg = style.foreground;
    if fg.a > 0 {
        ratatui_style = ratatui_style.fg(Color::Rgb(fg.r, fg.g, fg.b));
    }
    if style.font_style.contains(FontStyle::BOLD) {
        ratatui_style = ratatui_style.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        ratatui_style = ratatui_style.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        ratatui_style = ratatui_style.add_modifier(Modifier::UNDERLINED);
    }
    Span::styled(content.trim_end_matches(['\n', '\r']).to_owned(), ratatui_style)
}

/// Splits `text` into highlighted lines, one per source line.
///
/// Falls back to plain lines when no theme is available, the file is too
/// large, or syntect fails on a line.
pub fn highlight_source(text: &str, ext: &str) -> Vec<Line<'static>> {
    let theme = TS.themes.get("base16-ocean.dark").or_else(|| TS.themes.values().next());
    let theme = match theme {
        Some(t) if text.len() <= HIGHLIGHT_LIMIT => t,
        _ => return plain_lines(text),
    };
    let syntax = PS.find_syntax_by_extension(ext).unwrap_or_else(|| PS.find_syntax_plain_text());
    let mut h = HighlightLines::new(syntax, theme);

    syntect::util::LinesWithEndings::from(text)
        .map(|line| match h.highlight_line(line, &PS) {
            Ok(ranges) => Line::from(
                ranges
                    .into_iter()
                    .map(|(style, piece)| syntect_to_span(style, piece))
                    .filter(|s| !s.content.is_empty())
                    .collect::<Vec<_>>(),
            ),
            Err(_) => Line::raw(line.trim_end_matches(['\n', '\r']).to_owned()),
        })
        .collect()
}

fn plain_lines(text: &str) -> Vec<Line<'static>> {
    text.lines().map(|l| Line::raw(l.to_owned())).collect()
}

/// Extracts the file extension from a repository-relative path.
///
/// Returns "txt" if the path has no extension.
fn file_ext(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext,
        _ => "txt",
    }
}
