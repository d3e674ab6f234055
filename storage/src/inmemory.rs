//! In-memory session backend (tests, or running without persistence).

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::backend::SessionBackend;
use crate::error::StorageError;
use crate::models::Session;

#[derive(Default)]
pub struct InMemorySessionBackend {
    sessions: RwLock<HashMap<i64, Session>>,
}

impl InMemorySessionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chats with a stored session.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionBackend for InMemorySessionBackend {
    async fn get(&self, chat_id: i64) -> Result<Option<Session>, StorageError> {
        Ok(self.sessions.read().await.get(&chat_id).cloned())
    }

    async fn set(&self, chat_id: i64, session: &Session) -> Result<(), StorageError> {
        self.sessions.write().await.insert(chat_id, session.clone());
        Ok(())
    }

    async fn delete(&self, chat_id: i64) -> Result<(), StorageError> {
        self.sessions.write().await.remove(&chat_id);
        Ok(())
    }
}
