use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Open/closed state of an issue as reported by the issues API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// A single issue as returned by the remote API, normalised for the engine.
///
/// Issues are read-only to the engine. Their lifetime is one fetch cycle: the
/// next successful fetch (or cache read) supersedes the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub state: IssueState,
    pub html_url: String,
    pub is_pull_request: bool,
}

impl Issue {
    /// Parses the code reference embedded in the body, if any.
    pub fn reference(&self) -> Option<FileReference> {
        crate::reference::parse_reference(self.body.as_deref().unwrap_or_default())
    }

    /// Link shown for the issue: the embedded blob URL, else the issue page.
    pub fn link_url(&self) -> &str {
        self.body
            .as_deref()
            .and_then(crate::reference::first_blob_url)
            .unwrap_or(&self.html_url)
    }

    /// Body text with the embedded source link removed.
    pub fn display_body(&self) -> String {
        crate::reference::strip_reference(self.body.as_deref().unwrap_or_default())
    }

    pub fn is_open(&self) -> bool {
        self.state == IssueState::Open
    }
}

/// A repository-relative file location parsed from an issue body.
///
/// `end_line` is taken literally from the URL and may be smaller than
/// `start_line` for malformed ranges; nothing here swaps or rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileReference {
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
}

impl FileReference {
    /// Inclusive line span covered by the reference (empty when reversed).
    pub fn lines(&self) -> std::ops::RangeInclusive<u32> {
        self.start_line..=self.end_line
    }

    pub fn is_single_line(&self) -> bool {
        self.start_line == self.end_line
    }

    /// Formats the reference in the in-body syntax understood by the parser.
    pub fn to_blob_url(&self, host: &str, repo: &RepoId, git_ref: &str) -> String {
        let mut url = format!(
            "https://{host}/{}/{}/blob/{git_ref}/{}#L{}",
            repo.owner, repo.repo, self.file_path, self.start_line
        );
        if !self.is_single_line() {
            url.push_str(&format!("-L{}", self.end_line));
        }
        url
    }
}

/// Repository identity used for API calls and cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self { owner: owner.into(), repo: repo.into() }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Key of a sidebar group: a referenced file, or the catch-all for issues
/// without a code reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    File(String),
    Other,
}

impl GroupKey {
    /// Display form; `Other` renders as the `"other"` sentinel.
    pub fn as_str(&self) -> &str {
        match self {
            GroupKey::File(path) => path,
            GroupKey::Other => "other",
        }
    }
}

/// An open issue paired with its parsed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub issue: Arc<Issue>,
    pub reference: Option<FileReference>,
}

/// All annotations sharing one [`GroupKey`], in render order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup {
    pub key: GroupKey,
    pub annotations: Vec<Annotation>,
}

/// Derived views over the filtered issue set for one file.
///
/// Rebuilt on every render by [`crate::index::build_index`]. Compared with
/// `==` by the presentation layer to decide whether anything must be redrawn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationIndex {
    /// Groups ordered: current file, other files alphabetically, then `Other`.
    pub groups: Vec<FileGroup>,
    /// Every line of every range in the current file, mapped to its issues.
    pub line_to_issues: BTreeMap<u32, Vec<Arc<Issue>>>,
    /// First line of each range in the current file (one gutter marker per range).
    pub icon_lines: BTreeSet<u32>,
}

/// A cached issue list with its write time in unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub issues: Vec<Issue>,
    pub stored_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(body: Option<&str>) -> Issue {
        Issue {
            number: 7,
            title: "t".into(),
            body: body.map(str::to_owned),
            state: IssueState::Open,
            html_url: "https://github.com/o/r/issues/7".into(),
            is_pull_request: false,
        }
    }

    #[test]
    fn link_prefers_embedded_blob_url() {
        let with = issue(Some("see https://github.com/o/r/blob/main/a.rs#L2 please"));
        assert_eq!(with.link_url(), "https://github.com/o/r/blob/main/a.rs#L2");

        let without = issue(Some("nothing here"));
        assert_eq!(without.link_url(), "https://github.com/o/r/issues/7");
        assert_eq!(issue(None).link_url(), "https://github.com/o/r/issues/7");
    }

    #[test]
    fn display_body_of_missing_body_is_empty() {
        assert_eq!(issue(None).display_body(), "");
        assert_eq!(issue(None).reference(), None);
    }

    #[test]
    fn reversed_range_covers_no_lines() {
        let r = FileReference { file_path: "a.rs".into(), start_line: 9, end_line: 3 };
        assert_eq!(r.lines().count(), 0);
        assert!(!r.is_single_line());
    }

    #[test]
    fn blob_url_formats_single_and_range() {
        let repo = RepoId::new("o", "r");
        let single = FileReference { file_path: "src/a.rs".into(), start_line: 4, end_line: 4 };
        assert_eq!(
            single.to_blob_url("github.com", &repo, "main"),
            "https://github.com/o/r/blob/main/src/a.rs#L4"
        );
        let range = FileReference { end_line: 6, ..single };
        assert_eq!(
            range.to_blob_url("github.com", &repo, "main"),
            "https://github.com/o/r/blob/main/src/a.rs#L4-L6"
        );
    }

    #[test]
    fn other_sentinel_displays_as_other() {
        assert_eq!(GroupKey::Other.as_str(), "other");
        assert_ne!(GroupKey::Other, GroupKey::File("other".into()));
        assert_eq!(RepoId::new("o", "r").to_string(), "o/r");
    }
}
