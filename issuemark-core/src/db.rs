use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use serde_json::Value;
use tokio_rusqlite::Connection;

use crate::kv::{KvError, KvStore};

/// Opens (or creates) the SQLite database at `path`, configures WAL mode,
/// and applies schema migrations via the `schema_version` table.
///
/// `busy_timeout` is set through the `Connection` method rather than a PRAGMA
/// string so it takes effect regardless of pragma caching.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened, WAL
/// configuration fails, or schema DDL fails.
pub async fn open_db(path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = Connection::open(path).await?;

    conn.call(|db| -> rusqlite::Result<()> {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    })
    .await?;

    // Fold any WAL left behind by a previous run back into the main file.
    conn.call(|db| -> rusqlite::Result<()> {
        db.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
    })
    .await?;

    conn.call(|db| -> rusqlite::Result<()> { crate::schema::migrate(db) })
        .await?;

    Ok(conn)
}

/// Returns the current Unix timestamp in milliseconds.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// [`KvStore`] backed by the `kv` table of an [`open_db`] connection.
///
/// Cloning is cheap; clones share the same background connection thread.
#[derive(Clone)]
pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    /// Wraps a connection that has already been through [`open_db`].
    ///
    /// The `kv` table must exist; a raw connection without the migration
    /// makes every call fail with a storage error.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens the database at `path` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::Storage`] when [`open_db`] fails: the file cannot be
    /// created, WAL cannot be enabled, or the migration fails.
    pub async fn open(path: &str) -> Result<Self, KvError> {
        Ok(Self::new(open_db(path).await?))
    }
}

/// Values are stored as JSON text. `set` writes all entries in one
/// `BEGIN IMMEDIATE` transaction so a partially written batch is never seen.
#[async_trait]
impl KvStore for SqliteKv {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, KvError> {
        let keys: Vec<String> = keys.iter().map(|k| (*k).to_owned()).collect();

        let rows = self
            .conn
            .call(move |db| -> rusqlite::Result<Vec<(String, String)>> {
                let mut stmt = db.prepare_cached("SELECT value FROM kv WHERE key = ?1")?;
                let mut rows = Vec::with_capacity(keys.len());
                for key in keys {
                    let value: Option<String> = stmt
                        .query_row(rusqlite::params![&key], |r| r.get(0))
                        .optional()?;
                    if let Some(value) = value {
                        rows.push((key, value));
                    }
                }
                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(|(k, raw)| serde_json::from_str(&raw).map(|v| (k, v)).map_err(KvError::from))
            .collect()
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), KvError> {
        let encoded = entries
            .into_iter()
            .map(|(k, v)| serde_json::to_string(&v).map(|raw| (k, raw)))
            .collect::<Result<Vec<(String, String)>, serde_json::Error>>()?;

        self.conn
            .call(move |db| -> rusqlite::Result<()> {
                let now = now_millis();
                let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                {
                    let mut stmt = tx.prepare_cached(
                        "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                         ON CONFLICT(key)
                         DO UPDATE SET value = excluded.value,
                                       updated_at = excluded.updated_at",
                    )?;
                    for (key, value) in &encoded {
                        stmt.execute(rusqlite::params![key, value, now])?;
                    }
                }
                tx.commit()
            })
            .await?;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), KvError> {
        let keys: Vec<String> = keys.iter().map(|k| (*k).to_owned()).collect();

        self.conn
            .call(move |db| -> rusqlite::Result<()> {
                let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
                {
                    let mut stmt = tx.prepare_cached("DELETE FROM kv WHERE key = ?1")?;
                    for key in &keys {
                        stmt.execute(rusqlite::params![key])?;
                    }
                }
                tx.commit()
            })
            .await?;
        Ok(())
    }
}
