//! Hash-like key-value storage
//!
//! Values are JSON documents addressed by `(key, field)`.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use crate::error::Result;
use partydj_common::db::retry_on_lock;

/// Longest time a write waits on a locked database
const MAX_LOCK_WAIT_MS: u64 = 5000;

/// Per-key hash storage
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Value of `field` under `key`, if set
    async fn get(&self, key: &str, field: &str) -> Result<Option<Value>>;

    /// Set every `(field, value)` pair under `key`
    async fn set(&self, key: &str, fields: &[(&str, Value)]) -> Result<()>;

    /// Remove `key` with all its fields
    async fn delete(&self, key: &str) -> Result<()>;
}

/// `KvStore` on the `session_kv` table
#[derive(Clone)]
pub struct SqliteKvStore {
    pool: SqlitePool,
}

impl SqliteKvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str, field: &str) -> Result<Option<Value>> {
        let row = sqlx::query("SELECT value FROM session_kv WHERE key = ? AND field = ?")
            .bind(key)
            .bind(field)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.get("value");
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, fields: &[(&str, Value)]) -> Result<()> {
        let encoded = fields
            .iter()
            .map(|(field, value)| -> Result<(String, String)> {
                Ok((field.to_string(), serde_json::to_string(value)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let now = partydj_common::time::now().to_rfc3339();
        let encoded = &encoded;
        let now = now.as_str();
        let pool = &self.pool;

        retry_on_lock("kv_set", MAX_LOCK_WAIT_MS, || async move {
            let mut tx = pool.begin().await?;
            for (field, value) in encoded {
                sqlx::query(
                    r#"
                    INSERT INTO session_kv (key, field, value, updated_at)
                    VALUES (?, ?, ?, ?)
                    ON CONFLICT(key, field) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at
                    "#,
                )
                .bind(key)
                .bind(field)
                .bind(value)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await?;
            Ok::<(), partydj_common::Error>(())
        })
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM session_kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
