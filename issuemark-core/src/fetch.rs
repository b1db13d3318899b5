//! Issue retrieval: cache first, then the remote issues API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::cache::CacheStore;
use crate::types::{Issue, IssueState};

/// Default API root for github.com.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Page size requested from the issues endpoint (the API maximum).
pub const PER_PAGE: u32 = 100;

/// Failures surfaced to the caller when issues cannot be obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// HTTP 429. Unauthenticated clients hit this after 60 requests an hour.
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,
    /// HTTP 404, which the API also returns for private repositories when the
    /// token cannot see them.
    #[error("Repository not found or is private.")]
    NotFoundOrPrivate,
    /// Any other non-success status.
    #[error("Failed to fetch issues: {status} {status_text}")]
    Http { status: u16, status_text: String },
    /// No response: DNS, TLS, connect or read failure.
    #[error("Failed to fetch issues: {0}")]
    Network(String),
    /// A success response whose body is not an issue array.
    #[error("Failed to decode issues response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Maps a non-success HTTP status onto the error taxonomy.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
            StatusCode::NOT_FOUND => FetchError::NotFoundOrPrivate,
            other => FetchError::Http {
                status: other.as_u16(),
                status_text: other.canonical_reason().unwrap_or_default().to_owned(),
            },
        }
    }
}

/// Remote listing of a repository's open issues.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Returns up to one page of open issues, newest first. Pull requests may
    /// be included and are flagged via [`Issue::is_pull_request`].
    async fn list_open_issues(&self, owner: &str, repo: &str) -> Result<Vec<Issue>, FetchError>;
}

/// Issue object as served by the REST API.
#[derive(Debug, Deserialize)]
struct ApiIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: IssueState,
    html_url: String,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl From<ApiIssue> for Issue {
    fn from(api: ApiIssue) -> Self {
        Issue {
            number: api.number,
            title: api.title,
            body: api.body,
            state: api.state,
            html_url: api.html_url,
            is_pull_request: api.pull_request.is_some_and(|v| !v.is_null()),
        }
    }
}

/// Decodes an issues-endpoint JSON array.
///
/// Unknown fields are ignored; `body` may be absent or `null`.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] when `body` is not a JSON array of issue
/// objects.
pub fn decode_issues(body: &str) -> Result<Vec<Issue>, FetchError> {
    let items: Vec<ApiIssue> =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    Ok(items.into_iter().map(Issue::from).collect())
}

/// [`IssueSource`] talking to the GitHub REST API with `reqwest`.
#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl GithubClient {
    /// Builds a client for `api_base` (no trailing slash needed).
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the TLS backend cannot be initialised.
    pub fn new(api_base: &str, token: Option<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("issuemark/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_owned(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Endpoint for the newest page of open issues of `owner/repo`.
    ///
    /// Only the first page is requested, so repositories with more than
    /// [`PER_PAGE`] open issues show the most recent ones.
    pub fn issues_url(&self, owner: &str, repo: &str) -> String {
        format!(
            "{}/repos/{owner}/{repo}/issues?state=open&per_page={PER_PAGE}&sort=created&direction=desc",
            self.api_base
        )
    }
}

#[async_trait]
impl IssueSource for GithubClient {
    async fn list_open_issues(&self, owner: &str, repo: &str) -> Result<Vec<Issue>, FetchError> {
        let url = self.issues_url(owner, repo);
        let mut req = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json");
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let response = req.send().await.map_err(|e| FetchError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        decode_issues(&body)
    }
}

/// Orchestrates cache lookup, remote fetch, filtering, and cache refill.
#[derive(Clone)]
pub struct IssueFetcher {
    source: Arc<dyn IssueSource>,
    cache: CacheStore,
}

impl IssueFetcher {
    /// `source` is consulted only on a cache miss or when bypassing.
    pub fn new(source: Arc<dyn IssueSource>, cache: CacheStore) -> Self {
        Self { source, cache }
    }

    /// Returns the open, non-pull-request issues of `owner/repo`.
    ///
    /// A live cache entry is returned without touching the network unless
    /// `bypass_cache` is set. A remote fetch either yields the full filtered
    /// list (which then replaces the cache entry) or an error, in which case
    /// the cache is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the [`FetchError`] of the remote call. Cache failures never
    /// surface; they behave as a miss.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_issues(
        &self,
        owner: &str,
        repo: &str,
        bypass_cache: bool,
    ) -> Result<Vec<Issue>, FetchError> {
        let key = CacheStore::key(owner, repo);

        if !bypass_cache {
            if let Some(entry) = self.cache.get(&key).await {
                tracing::debug!(count = entry.issues.len(), "cache hit");
                return Ok(entry.issues);
            }
        }

        let issues: Vec<Issue> = match self.source.list_open_issues(owner, repo).await {
            Ok(issues) => issues.into_iter().filter(|i| !i.is_pull_request).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "issue fetch failed");
                return Err(e);
            }
        };

        self.cache.put(&key, &issues).await;
        tracing::info!(count = issues.len(), "fetched issues");
        Ok(issues)
    }

    /// Forgets the cached list for `owner/repo`.
    pub async fn invalidate(&self, owner: &str, repo: &str) {
        self.cache.invalidate(&CacheStore::key(owner, repo)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted source that counts calls and replays queued responses.
    struct FakeSource {
        calls: AtomicUsize,
        responses: Mutex<Vec<Result<Vec<Issue>, FetchError>>>,
    }

    impl FakeSource {
        fn new(responses: Vec<Result<Vec<Issue>, FetchError>>) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), responses: Mutex::new(responses) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IssueSource for FakeSource {
        async fn list_open_issues(&self, _: &str, _: &str) -> Result<Vec<Issue>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn issue(number: u64, pr: bool) -> Issue {
        Issue {
            number,
            title: format!("#{number}"),
            body: Some(String::new()),
            state: IssueState::Open,
            html_url: format!("https://github.com/o/r/issues/{number}"),
            is_pull_request: pr,
        }
    }

    fn fetcher(source: Arc<FakeSource>) -> (IssueFetcher, CacheStore) {
        let cache = CacheStore::new(Arc::new(MemoryKv::new()));
        (IssueFetcher::new(source, cache.clone()), cache)
    }

    #[tokio::test]
    async fn remote_results_are_filtered_and_cached() {
        let source = FakeSource::new(vec![Ok(vec![issue(1, false), issue(2, true), issue(3, false)])]);
        let (fetcher, cache) = fetcher(Arc::clone(&source));

        let issues = fetcher.fetch_issues("o", "r", false).await.unwrap();
        assert_eq!(issues.iter().map(|i| i.number).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(source.calls(), 1);

        let cached = cache.get("issues:o:r").await.unwrap();
        assert_eq!(cached.issues, issues);
    }

    #[tokio::test]
    async fn cache_hit_skips_network() {
        let source = FakeSource::new(vec![Ok(vec![issue(1, false)])]);
        let (fetcher, _) = fetcher(Arc::clone(&source));

        fetcher.fetch_issues("o", "r", false).await.unwrap();
        let again = fetcher.fetch_issues("o", "r", false).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn bypass_goes_to_network_and_replaces_cache() {
        let source = FakeSource::new(vec![Ok(vec![issue(1, false)]), Ok(vec![issue(7, false)])]);
        let (fetcher, cache) = fetcher(Arc::clone(&source));

        fetcher.fetch_issues("o", "r", false).await.unwrap();
        let fresh = fetcher.fetch_issues("o", "r", true).await.unwrap();
        assert_eq!(fresh[0].number, 7);
        assert_eq!(source.calls(), 2);
        assert_eq!(cache.get("issues:o:r").await.unwrap().issues[0].number, 7);
    }

    #[tokio::test]
    async fn errors_propagate_and_leave_cache_untouched() {
        let source = FakeSource::new(vec![
            Ok(vec![issue(1, false)]),
            Err(FetchError::RateLimited),
        ]);
        let (fetcher, cache) = fetcher(Arc::clone(&source));

        fetcher.fetch_issues("o", "r", false).await.unwrap();
        let err = fetcher.fetch_issues("o", "r", true).await.unwrap_err();
        assert_eq!(err, FetchError::RateLimited);
        assert_eq!(cache.get("issues:o:r").await.unwrap().issues[0].number, 1);
    }

    #[tokio::test]
    async fn error_on_cold_cache_stores_nothing() {
        let source = FakeSource::new(vec![Err(FetchError::NotFoundOrPrivate)]);
        let (fetcher, cache) = fetcher(source);
        assert!(fetcher.fetch_issues("o", "r", false).await.is_err());
        assert!(cache.get("issues:o:r").await.is_none());
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let source = FakeSource::new(vec![Ok(vec![]), Ok(vec![issue(2, false)])]);
        let (fetcher, _) = fetcher(Arc::clone(&source));
        fetcher.fetch_issues("o", "r", false).await.unwrap();
        fetcher.invalidate("o", "r").await;
        let issues = fetcher.fetch_issues("o", "r", false).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn status_classification() {
        assert_eq!(FetchError::from_status(StatusCode::TOO_MANY_REQUESTS), FetchError::RateLimited);
        assert_eq!(FetchError::from_status(StatusCode::NOT_FOUND), FetchError::NotFoundOrPrivate);
        let err = FetchError::from_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err,
            FetchError::Http { status: 500, status_text: "Internal Server Error".into() }
        );
        assert_eq!(err.to_string(), "Failed to fetch issues: 500 Internal Server Error");
        assert_eq!(
            FetchError::RateLimited.to_string(),
            "Rate limit exceeded. Please try again later."
        );
    }

    #[test]
    fn decode_flags_pull_requests() {
        let body = r#"[
            {"number": 1, "title": "a", "body": null, "state": "open",
             "html_url": "https://github.com/o/r/issues/1"},
            {"number": 2, "title": "b", "body": "x", "state": "open",
             "html_url": "https://github.com/o/r/pull/2",
             "pull_request": {"url": "https://api.github.com/repos/o/r/pulls/2"}},
            {"number": 3, "title": "c", "body": "y", "state": "closed",
             "html_url": "https://github.com/o/r/issues/3", "pull_request": null,
             "labels": []}
        ]"#;
        let issues = decode_issues(body).unwrap();
        assert_eq!(issues.len(), 3);
        assert!(!issues[0].is_pull_request);
        assert!(issues[0].body.is_none());
        assert!(issues[1].is_pull_request);
        assert!(!issues[2].is_pull_request);
        assert_eq!(issues[2].state, IssueState::Closed);
    }

    #[test]
    fn decode_rejects_non_array() {
        assert!(matches!(
            decode_issues(r#"{"message": "Bad credentials"}"#),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn issues_url_shape() {
        let client = GithubClient::new("https://api.github.com/", None).unwrap();
        assert_eq!(
            client.issues_url("o", "r"),
            "https://api.github.com/repos/o/r/issues?state=open&per_page=100&sort=created&direction=desc"
        );
    }
}
