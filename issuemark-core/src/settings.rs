//! Persisted viewer preferences: the global on/off switch and the last
//! annotation the user opened.
//!
//! Reads that fail fall back to defaults and writes that fail are logged, the
//! same policy as the issue cache.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::kv::KvStore;

const ENABLED_KEY: &str = "annotations_enabled";
const LAST_CLICKED_KEY: &str = "last_clicked_annotation";

/// The annotation most recently jumped to, so a reopened file can restore it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationPointer {
    pub owner: String,
    pub repo: String,
    pub issue_number: u64,
    pub file_path: String,
    pub line: u32,
}

impl AnnotationPointer {
    /// True when the pointer targets `file_path` in `owner/repo`.
    pub fn points_into(&self, owner: &str, repo: &str, file_path: &str) -> bool {
        self.owner == owner && self.repo == repo && self.file_path == file_path
    }
}

/// User preferences persisted through a [`KvStore`].
///
/// Nothing here returns an error. A failed read yields the default (enabled,
/// no pointer) and a failed write is logged and dropped, so a broken store
/// degrades to per-session behaviour instead of blocking the viewer.
#[derive(Clone)]
pub struct Settings {
    kv: Arc<dyn KvStore>,
}

impl Settings {
    /// Shares `kv` with other users of the store, typically the cache.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Whether annotations are shown. Defaults to `true` when unset or unreadable.
    pub async fn is_enabled(&self) -> bool {
        match self.kv.get(&[ENABLED_KEY]).await {
            Ok(mut found) => found
                .remove(ENABLED_KEY)
                .and_then(|v| v.as_bool())
                .unwrap_or(true),
            Err(e) => {
                tracing::warn!(error = %e, "could not read enabled flag, assuming enabled");
                true
            }
        }
    }

    /// Persists the enabled flag. Failures are logged only.
    pub async fn set_enabled(&self, enabled: bool) {
        let entries = HashMap::from([(ENABLED_KEY.to_owned(), serde_json::Value::Bool(enabled))]);
        if let Err(e) = self.kv.set(entries).await {
            tracing::warn!(error = %e, enabled, "could not persist enabled flag");
        }
    }

    /// Flips the enabled flag and returns the new state.
    pub async fn toggle(&self) -> bool {
        let next = !self.is_enabled().await;
        self.set_enabled(next).await;
        next
    }

    /// The pointer stored by [`Settings::set_last_clicked`], if any.
    ///
    /// A value that no longer decodes (for example after a format change)
    /// reads as `None`.
    pub async fn last_clicked(&self) -> Option<AnnotationPointer> {
        let mut found = match self.kv.get(&[LAST_CLICKED_KEY]).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "could not read last clicked annotation");
                return None;
            }
        };
        serde_json::from_value(found.remove(LAST_CLICKED_KEY)?).ok()
    }

    /// Replaces the stored pointer. Failures are logged only.
    pub async fn set_last_clicked(&self, pointer: &AnnotationPointer) {
        let value = match serde_json::to_value(pointer) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode annotation pointer");
                return;
            }
        };
        if let Err(e) = self.kv.set(HashMap::from([(LAST_CLICKED_KEY.to_owned(), value)])).await {
            tracing::warn!(error = %e, "could not persist last clicked annotation");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    #[tokio::test]
    async fn enabled_defaults_to_true_and_toggles() {
        let settings = Settings::new(Arc::new(MemoryKv::new()));
        assert!(settings.is_enabled().await);
        assert!(!settings.toggle().await);
        assert!(!settings.is_enabled().await);
        assert!(settings.toggle().await);
        settings.set_enabled(false).await;
        assert!(!settings.is_enabled().await);
    }

    #[tokio::test]
    async fn last_clicked_round_trip() {
        let settings = Settings::new(Arc::new(MemoryKv::new()));
        assert!(settings.last_clicked().await.is_none());

        let ptr = AnnotationPointer {
            owner: "o".into(),
            repo: "r".into(),
            issue_number: 12,
            file_path: "src/x.rs".into(),
            line: 40,
        };
        settings.set_last_clicked(&ptr).await;
        let got = settings.last_clicked().await.unwrap();
        assert_eq!(got, ptr);
        assert!(got.points_into("o", "r", "src/x.rs"));
        assert!(!got.points_into("o", "r", "src/y.rs"));
    }
}
