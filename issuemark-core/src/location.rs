//! Classification of repository URLs: blob pages, repository roots, and git
//! remotes.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::RepoId;

/// What a web URL points at, as far as annotation is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLocation {
    /// A file view: `https://<host>/<owner>/<repo>/blob/<ref>/<path>[#L<N>[-L<M>]]`.
    Blob {
        repo: RepoId,
        git_ref: String,
        path: String,
        lines: Option<(u32, u32)>,
    },
    /// A repository root: exactly `https://<host>/<owner>/<repo>`.
    Repository(RepoId),
    Other,
}

static BLOB_PAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://[^/\s]+/([^/\s]+)/([^/\s]+)/blob/([^/\s]+)/([^#?\s]+)(?:\?[^#\s]*)?(?:#L(\d+)(?:-L(\d+))?)?$",
    )
    .expect("blob page pattern is valid")
});

static REPO_PAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^/\s]+/([^/\s]+)/([^/\s]+)$").expect("repo page pattern is valid")
});

static REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:https?|ssh|git)://(?:[^@/]+@)?[^/]+/|[^@:/]+@[^:]+:)([^/]+)/([^/]+?)(?:\.git)?/?$")
        .expect("remote pattern is valid")
});

impl PageLocation {
    pub fn parse(url: &str) -> Self {
        let url = url.trim();
        if let Some(c) = BLOB_PAGE.captures(url) {
            let start = c.get(5).and_then(|m| m.as_str().parse::<u32>().ok());
            let end = c.get(6).and_then(|m| m.as_str().parse::<u32>().ok());
            return PageLocation::Blob {
                repo: RepoId::new(&c[1], &c[2]),
                git_ref: c[3].to_owned(),
                path: c[4].to_owned(),
                lines: start.map(|s| (s, end.unwrap_or(s))),
            };
        }
        if let Some(c) = REPO_PAGE.captures(url.trim_end_matches('/')) {
            return PageLocation::Repository(RepoId::new(&c[1], &c[2]));
        }
        PageLocation::Other
    }

    pub fn repo(&self) -> Option<&RepoId> {
        match self {
            PageLocation::Blob { repo, .. } | PageLocation::Repository(repo) => Some(repo),
            PageLocation::Other => None,
        }
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, PageLocation::Blob { .. })
    }
}

impl RepoId {
    /// Derives the repository identity from a git remote URL.
    ///
    /// Accepts `https://host/owner/repo(.git)`, `ssh://git@host/owner/repo(.git)`
    /// and the scp-like `git@host:owner/repo(.git)`.
    pub fn from_remote_url(url: &str) -> Option<Self> {
        let c = REMOTE.captures(url.trim())?;
        Some(RepoId::new(&c[1], &c[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_page_with_range() {
        let loc = PageLocation::parse("https://github.com/o/r/blob/main/src/a.rs#L3-L9");
        assert_eq!(
            loc,
            PageLocation::Blob {
                repo: RepoId::new("o", "r"),
                git_ref: "main".into(),
                path: "src/a.rs".into(),
                lines: Some((3, 9)),
            }
        );
        assert!(loc.is_blob());
    }

    #[test]
    fn blob_page_without_fragment() {
        match PageLocation::parse("https://github.com/o/r/blob/v1.0/README.md?plain=1") {
            PageLocation::Blob { path, lines, git_ref, .. } => {
                assert_eq!(path, "README.md");
                assert_eq!(git_ref, "v1.0");
                assert_eq!(lines, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn repository_root_only() {
        assert_eq!(
            PageLocation::parse("https://github.com/o/r/"),
            PageLocation::Repository(RepoId::new("o", "r"))
        );
        assert_eq!(PageLocation::parse("https://github.com/o/r/issues"), PageLocation::Other);
        assert_eq!(PageLocation::parse("https://github.com/o"), PageLocation::Other);
        assert_eq!(PageLocation::parse("not a url").repo(), None);
    }

    #[test]
    fn remote_urls() {
        let want = Some(RepoId::new("octo", "cat"));
        assert_eq!(RepoId::from_remote_url("https://github.com/octo/cat.git"), want);
        assert_eq!(RepoId::from_remote_url("https://github.com/octo/cat"), want);
        assert_eq!(RepoId::from_remote_url("git@github.com:octo/cat.git"), want);
        assert_eq!(RepoId::from_remote_url("ssh://git@github.com/octo/cat.git"), want);
        assert_eq!(RepoId::from_remote_url("https://user@github.com/octo/cat/"), want);
        assert_eq!(RepoId::from_remote_url("/srv/git/cat"), None);
    }
}
