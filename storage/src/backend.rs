//! Key-value backend for whole sessions.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::Session;

/// Persists complete [`Session`] values keyed by chat id.
///
/// Implementations write a session atomically: a reader sees either the previous or the new
/// value, never a mix. The store above serializes access per chat, so backends need no
/// read-modify-write protection of their own.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn get(&self, chat_id: i64) -> Result<Option<Session>, StorageError>;
    async fn set(&self, chat_id: i64, session: &Session) -> Result<(), StorageError>;
    async fn delete(&self, chat_id: i64) -> Result<(), StorageError>;
}
