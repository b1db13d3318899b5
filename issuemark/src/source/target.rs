//! Resolves the command-line target into a repository and an optional file.
//!
//! A target is either a path inside a local git checkout, or a blob / repository
//! URL. For URLs the current directory's checkout is used for source text when
//! its `origin` points at the same repository.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use git2::Repository;
use issuemark_core::location::PageLocation;
use issuemark_core::types::RepoId;

/// What the viewer was asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub repo: RepoId,
    /// Repository-relative, `/`-separated. `None` for a whole-repository view.
    pub file_path: Option<String>,
    /// Revision named by a blob URL; local paths always use the working tree.
    pub git_ref: Option<String>,
    /// Line range named by a blob URL fragment.
    pub lines: Option<(u32, u32)>,
    /// Working directory of the local checkout, if one is available.
    pub workdir: Option<PathBuf>,
}

pub fn resolve(arg: &str, cwd: &Path) -> anyhow::Result<Target> {
    if arg.starts_with("https://") || arg.starts_with("http://") {
        return resolve_url(arg, cwd);
    }
    resolve_path(&cwd.join(arg))
}

fn resolve_url(url: &str, cwd: &Path) -> anyhow::Result<Target> {
    match PageLocation::parse(url) {
        PageLocation::Blob { repo, git_ref, path, lines } => {
            let workdir = matching_checkout(cwd, &repo);
            Ok(Target { repo, file_path: Some(path), git_ref: Some(git_ref), lines, workdir })
        }
        PageLocation::Repository(repo) => {
            let workdir = matching_checkout(cwd, &repo);
            Ok(Target { repo, file_path: None, git_ref: None, lines: None, workdir })
        }
        PageLocation::Other => bail!("{url} is neither a file view nor a repository URL"),
    }
}

fn resolve_path(path: &Path) -> anyhow::Result<Target> {
    let abs = path
        .canonicalize()
        .with_context(|| format!("cannot open {}", path.display()))?;
    let repo = Repository::discover(&abs)
        .with_context(|| format!("{} is not inside a git repository", abs.display()))?;
    let workdir = repo
        .workdir()
        .context("bare repositories have no files to show")?
        .canonicalize()?;
    let id = origin_repo_id(&repo)
        .context("the repository has no `origin` remote pointing at a hosted repository")?;

    let rel = abs.strip_prefix(&workdir).unwrap_or(Path::new(""));
    let file_path = if abs.is_file() { Some(to_slash(rel)) } else { None };

    Ok(Target { repo: id, file_path, git_ref: None, lines: None, workdir: Some(workdir) })
}

/// `RepoId` of the `origin` remote, if it parses as a hosted repository URL.
pub fn origin_repo_id(repo: &Repository) -> Option<RepoId> {
    let remote = repo.find_remote("origin").ok()?;
    RepoId::from_remote_url(remote.url()?)
}

fn matching_checkout(cwd: &Path, wanted: &RepoId) -> Option<PathBuf> {
    let repo = Repository::discover(cwd).ok()?;
    let id = origin_repo_id(&repo)?;
    let same = id.owner.eq_ignore_ascii_case(&wanted.owner)
        && id.repo.eq_ignore_ascii_case(&wanted.repo);
    if !same {
        tracing::debug!(local = %id, wanted = %wanted, "local checkout is a different repository");
        return None;
    }
    repo.workdir().map(Path::to_path_buf)
}

fn to_slash(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkout(origin: &str) -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.remote("origin", origin).unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "fn main() {}\n").unwrap();
        dir
    }

    #[test]
    fn local_file_resolves_to_origin_and_relative_path() {
        let dir = checkout("git@github.com:octo/cat.git");
        let target = resolve("src/lib.rs", dir.path()).unwrap();
        assert_eq!(target.repo, RepoId::new("octo", "cat"));
        assert_eq!(target.file_path.as_deref(), Some("src/lib.rs"));
        assert!(target.workdir.is_some());
        assert!(target.git_ref.is_none());
    }

    #[test]
    fn local_directory_is_a_repository_view() {
        let dir = checkout("https://github.com/octo/cat");
        let target = resolve(".", dir.path()).unwrap();
        assert_eq!(target.file_path, None);
    }

    #[test]
    fn missing_origin_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        assert!(resolve("a.txt", dir.path()).is_err());
    }

    #[test]
    fn blob_url_uses_matching_checkout() {
        let dir = checkout("https://github.com/Octo/Cat.git");
        let target =
            resolve("https://github.com/octo/cat/blob/main/src/lib.rs#L4-L6", dir.path()).unwrap();
        assert_eq!(target.file_path.as_deref(), Some("src/lib.rs"));
        assert_eq!(target.git_ref.as_deref(), Some("main"));
        assert_eq!(target.lines, Some((4, 6)));
        assert!(target.workdir.is_some());
    }

    #[test]
    fn url_for_other_repository_has_no_checkout() {
        let dir = checkout("https://github.com/octo/cat.git");
        let target = resolve("https://github.com/rust-lang/rust", dir.path()).unwrap();
        assert_eq!(target.repo, RepoId::new("rust-lang", "rust"));
        assert!(target.workdir.is_none());
        assert!(resolve("https://github.com/rust-lang/rust/issues", dir.path()).is_err());
    }
}
