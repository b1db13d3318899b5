//! Issue-list cache with a fixed time-to-live.
//!
//! Cache failures never reach callers. A storage error on read is a miss; a
//! storage error on write is logged and the data is dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::kv::KvStore;
use crate::types::{CacheEntry, Issue};

/// How long a cached issue list stays valid.
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Source of "now" in unix milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Typed cache of issue lists on top of a [`KvStore`].
#[derive(Clone)]
pub struct CacheStore {
    kv: Arc<dyn KvStore>,
    clock: Clock,
}

impl CacheStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self::with_clock(kv, Arc::new(crate::db::now_millis))
    }

    pub fn with_clock(kv: Arc<dyn KvStore>, clock: Clock) -> Self {
        Self { kv, clock }
    }

    /// Composite key for one repository: `issues:{owner}:{repo}`.
    pub fn key(owner: &str, repo: &str) -> String {
        format!("issues:{owner}:{repo}")
    }

    /// Returns the live entry for `key`, or `None` if absent, unreadable, or
    /// older than [`CACHE_TTL`]. Expired entries are left in place.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let mut found = match self.kv.get(&[key]).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };
        let raw = found.remove(key)?;
        let entry: CacheEntry = match serde_json::from_value(raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache entry undecodable, treating as miss");
                return None;
            }
        };

        let age = (self.clock)().saturating_sub(entry.stored_at);
        if age > CACHE_TTL.as_millis() as i64 {
            tracing::debug!(key, age_ms = age, "cache entry expired");
            return None;
        }
        Some(entry)
    }

    /// Replaces the entry for `key` with `issues`, stamped with the current time.
    pub async fn put(&self, key: &str, issues: &[Issue]) {
        let entry = CacheEntry { issues: issues.to_vec(), stored_at: (self.clock)() };
        let value = match serde_json::to_value(&entry) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache entry not encodable, dropped");
                return;
            }
        };
        if let Err(e) = self.kv.set(HashMap::from([(key.to_owned(), value)])).await {
            tracing::warn!(key, error = %e, "cache write failed, dropped");
        }
    }

    /// Drops the entry for `key`, if any.
    pub async fn invalidate(&self, key: &str) {
        if let Err(e) = self.kv.remove(&[key]).await {
            tracing::warn!(key, error = %e, "cache invalidate failed");
        }
    }
}
