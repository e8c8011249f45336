use async_trait::async_trait;
use sqlx::SqlitePool;

use drinkwater_core::{KeyValueStore, StoreError};

/// Key-value store backed by the `kv` table.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO kv (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError> {
        let result = match expected {
            None => {
                sqlx::query("INSERT INTO kv (key, value) VALUES (?, ?) ON CONFLICT(key) DO NOTHING")
                    .bind(key)
                    .bind(value)
                    .execute(&self.pool)
                    .await
            }
            Some(expected) => {
                sqlx::query("UPDATE kv SET value = ? WHERE key = ? AND value = ?")
                    .bind(value)
                    .bind(key)
                    .bind(expected)
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(backend)?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use drinkwater_core::{HistoryLog, ProgressTracker, UserId};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn test_store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        (SqliteStore::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let (store, _temp) = test_store().await;
        assert_eq!(store.get("waterProgress_nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let (store, _temp) = test_store().await;
        store.set("k", "1").await.unwrap();
        store.set("k", "2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("2".to_string()));
    }

    #[tokio::test]
    async fn test_compare_and_set() {
        let (store, _temp) = test_store().await;

        assert!(store.compare_and_set("k", None, "a").await.unwrap());
        assert!(!store.compare_and_set("k", None, "b").await.unwrap());
        assert!(!store.compare_and_set("k", Some("b"), "c").await.unwrap());
        assert!(store.compare_and_set("k", Some("a"), "c").await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some("c".to_string()));
    }

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("test.db");
        let uid = UserId::new("ana");

        {
            let store = Arc::new(SqliteStore::new(init_db(&path).await.unwrap()));
            ProgressTracker::new(store.clone())
                .record(&uid, 300)
                .await
                .unwrap();
            HistoryLog::new(store).append(&uid, 300).await.unwrap();
        }

        let store = Arc::new(SqliteStore::new(init_db(&path).await.unwrap()));
        assert_eq!(ProgressTracker::new(store.clone()).load(&uid).await, 300);
        assert_eq!(HistoryLog::new(store).load(&uid).await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_progress_records() {
        let (store, _temp) = test_store().await;
        let tracker = ProgressTracker::new(Arc::new(store));
        let uid = UserId::new("ana");

        let mut handles = Vec::new();
        for _ in 0..4 {
            let tracker = tracker.clone();
            let uid = uid.clone();
            handles.push(tokio::spawn(async move {
                let mut recorded = 0;
                for _ in 0..5 {
                    if tracker.record(&uid, 100).await.is_ok() {
                        recorded += 100;
                    }
                }
                recorded
            }));
        }
        let mut expected = 0;
        for handle in handles {
            expected += handle.await.unwrap();
        }

        assert_eq!(tracker.load(&uid).await, expected);
    }
}
