//! Owned messages exchanged with the source worker thread.
//!
//! Everything here is `Send` so it can cross from the thread that owns the
//! `git2::Repository` to the UI loop.

/// Commands sent from the main loop to the source worker thread.
#[derive(Debug)]
pub enum SourceRequest {
    /// Load and highlight a repository-relative file.
    ///
    /// When `git_ref` is set the blob at that revision is preferred over the
    /// working tree copy.
    Load {
        path: String,
        git_ref: Option<String>,
    },
}

/// Where the loaded text came from; shown in the source panel title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    WorkingTree,
    Revision(String),
}

/// Result sent back as `AppEvent::SourceLoaded(Box<SourcePayload>)`.
///
/// `lines` holds one highlighted line per source line, without gutter. The
/// gutter and annotation highlighting are applied by the app state so they
/// can change without re-running syntect.
#[derive(Debug)]
pub struct SourcePayload {
    pub path: String,
    pub origin: Option<SourceOrigin>,
    pub lines: Vec<ratatui::text::Line<'static>>,
    /// Set when the file could not be read from either the working tree or git.
    pub error: Option<String>,
}
