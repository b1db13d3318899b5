//! Integration test for the SQLite-backed key-value store and the cache and
//! settings layered on it.

use std::collections::HashMap;
use std::sync::Arc;

use issuemark_core::cache::CacheStore;
use issuemark_core::db::{self, SqliteKv};
use issuemark_core::kv::KvStore;
use issuemark_core::settings::{AnnotationPointer, Settings};
use issuemark_core::types::{Issue, IssueState};
use serde_json::json;

fn temp_db_path() -> String {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.keep().join("test.db");
    path.to_string_lossy().to_string()
}

fn open_issue(number: u64, body: &str) -> Issue {
    Issue {
        number,
        title: format!("issue {number}"),
        body: Some(body.to_owned()),
        state: IssueState::Open,
        html_url: format!("https://github.com/o/r/issues/{number}"),
        is_pull_request: false,
    }
}

#[tokio::test]
async fn full_kv_lifecycle() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();

    // Verify schema_version = 1
    let version: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row(
                "SELECT MAX(version) FROM schema_version",
                [],
                |r| r.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(version, 1, "schema_version should be 1");

    // Verify WAL mode
    let journal: String = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(
                db.query_row("PRAGMA journal_mode", [], |r| r.get(0))?,
            )
        })
        .await
        .unwrap();
    assert_eq!(journal, "wal", "journal_mode should be wal");

    let kv = SqliteKv::new(conn.clone());

    // Missing keys are absent, not errors
    let found = kv.get(&["nope"]).await.unwrap();
    assert!(found.is_empty());

    kv.set(HashMap::from([
        ("a".to_owned(), json!(1)),
        ("b".to_owned(), json!({"x": [1, 2]})),
    ]))
    .await
    .unwrap();

    let found = kv.get(&["a", "b", "c"]).await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found["a"], json!(1));
    assert_eq!(found["b"], json!({"x": [1, 2]}));

    // Overwrite replaces, not appends
    kv.set(HashMap::from([("a".to_owned(), json!("two"))])).await.unwrap();
    let rows: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(
                db.query_row("SELECT COUNT(*) FROM kv", [], |r| r.get(0))?,
            )
        })
        .await
        .unwrap();
    assert_eq!(rows, 2, "upsert should not duplicate keys");

    kv.remove(&["b", "never-set"]).await.unwrap();
    let found = kv.get(&["a", "b"]).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found["a"], json!("two"));

    // Verify persistence: open a second connection to same DB
    let kv2 = SqliteKv::open(&path).await.unwrap();
    let found = kv2.get(&["a"]).await.unwrap();
    assert_eq!(found["a"], json!("two"), "values should persist across connections");
}

#[tokio::test]
async fn cache_and_settings_survive_reopen() {
    let path = temp_db_path();

    {
        let kv: Arc<dyn KvStore> = Arc::new(SqliteKv::open(&path).await.unwrap());
        let cache = CacheStore::new(Arc::clone(&kv));
        cache
            .put(
                &CacheStore::key("o", "r"),
                &[open_issue(4, "see https://github.com/o/r/blob/main/a.rs#L2")],
            )
            .await;

        let settings = Settings::new(kv);
        settings.set_enabled(false).await;
        settings
            .set_last_clicked(&AnnotationPointer {
                owner: "o".into(),
                repo: "r".into(),
                issue_number: 4,
                file_path: "a.rs".into(),
                line: 2,
            })
            .await;
    }

    let kv: Arc<dyn KvStore> = Arc::new(SqliteKv::open(&path).await.unwrap());
    let cache = CacheStore::new(Arc::clone(&kv));
    let entry = cache.get("issues:o:r").await.expect("entry within ttl");
    assert_eq!(entry.issues.len(), 1);
    assert_eq!(entry.issues[0].number, 4);

    let settings = Settings::new(kv);
    assert!(!settings.is_enabled().await);
    assert_eq!(settings.last_clicked().await.unwrap().line, 2);

    cache.invalidate("issues:o:r").await;
    assert!(cache.get("issues:o:r").await.is_none());
}

#[tokio::test]
async fn open_db_is_idempotent_on_existing_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("again.db").to_string_lossy().to_string();

    let first = SqliteKv::open(&path).await.unwrap();
    first.set(HashMap::from([("k".to_owned(), json!(true))])).await.unwrap();

    // Re-running the migration must not wipe data or add version rows
    let conn = db::open_db(&path).await.unwrap();
    let versions: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(
                db.query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))?,
            )
        })
        .await
        .unwrap();
    assert_eq!(versions, 1);

    let found = SqliteKv::new(conn).get(&["k"]).await.unwrap();
    assert_eq!(found["k"], json!(true));
}
