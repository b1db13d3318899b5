//! Persistent key-value capability used by the cache and settings.
//!
//! The engine only talks to storage through [`KvStore`]. Values are JSON so the
//! same store can hold issue lists, flags, and pointers.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

/// Errors raised by a [`KvStore`] backend.
///
/// Callers in this crate never surface these: reads degrade to "absent" and
/// writes are logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("storage error: {0}")]
    Storage(#[from] tokio_rusqlite::Error),
    #[error("value encoding error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Asynchronous key-value store provided by the host.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the values present for `keys`; missing keys are simply absent.
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, KvError>;

    /// Writes every entry, replacing existing values.
    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), KvError>;

    /// Removes `keys`; unknown keys are ignored.
    async fn remove(&self, keys: &[&str]) -> Result<(), KvError>;
}

/// Process-local store. Used in tests and as the fallback when the database
/// cannot be opened.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryKv {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>, KvError> {
        self.entries
            .lock()
            .map_err(|_| KvError::Unavailable("memory store lock poisoned".to_owned()))
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, KvError> {
        let entries = self.lock()?;
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(*k).map(|v| ((*k).to_owned(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), KvError> {
        self.lock()?.extend(entries);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), KvError> {
        let mut entries = self.lock()?;
        for k in keys {
            entries.remove(*k);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_get_set_remove() {
        let kv = MemoryKv::new();
        assert!(kv.get(&["a"]).await.unwrap().is_empty());

        kv.set(HashMap::from([
            ("a".to_owned(), json!(1)),
            ("b".to_owned(), json!({"x": true})),
        ]))
        .await
        .unwrap();

        let got = kv.get(&["a", "b", "c"]).await.unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got["b"], json!({"x": true}));

        kv.remove(&["a", "missing"]).await.unwrap();
        let got = kv.get(&["a", "b"]).await.unwrap();
        assert_eq!(got.keys().collect::<Vec<_>>(), vec!["b"]);
    }
}
