//! SQLite session backend: one row per chat holding the session as JSON.
//!
//! Every `set` is a single upsert statement, so a crash loses at most the write in flight and
//! never leaves a partially updated session behind.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::backend::SessionBackend;
use crate::error::StorageError;
use crate::models::Session;
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct SqliteSessionBackend {
    pool_manager: SqlitePoolManager,
}

impl SqliteSessionBackend {
    /// Opens (or creates) the session database at `path` and ensures the schema exists.
    pub async fn new(path: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(path).await?;
        let backend = Self { pool_manager };
        backend.init().await?;
        Ok(backend)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating sessions table if not exist");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                chat_id INTEGER PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool_manager.pool())
        .await?;

        Ok(())
    }

    /// Number of stored sessions.
    pub async fn count(&self) -> Result<i64, StorageError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(self.pool_manager.pool())
            .await?;
        Ok(row.0)
    }
}

#[async_trait]
impl SessionBackend for SqliteSessionBackend {
    async fn get(&self, chat_id: i64) -> Result<Option<Session>, StorageError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM sessions WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_optional(self.pool_manager.pool())
            .await?;

        match row {
            Some((data,)) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, chat_id: i64, session: &Session) -> Result<(), StorageError> {
        let data = serde_json::to_string(session)?;

        sqlx::query(
            r#"
            INSERT INTO sessions (chat_id, data, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
            "#,
        )
        .bind(chat_id)
        .bind(&data)
        .bind(Utc::now())
        .execute(self.pool_manager.pool())
        .await?;

        debug!(
            chat_id = chat_id,
            turns = session.messages.len(),
            has_facts = session.facts.is_some(),
            "Saved session"
        );
        Ok(())
    }

    async fn delete(&self, chat_id: i64) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM sessions WHERE chat_id = ?")
            .bind(chat_id)
            .execute(self.pool_manager.pool())
            .await?;

        debug!(chat_id = chat_id, rows = result.rows_affected(), "Deleted session");
        Ok(())
    }
}
