//! Session store: per-chat serialized access to [`Session`]s on top of a [`SessionBackend`].
//!
//! A [`SessionGuard`] owns the chat's async mutex for as long as it lives. Handlers hold one for
//! a whole turn (append the user turn, run the relay, commit the reply), so two updates for the
//! same chat never interleave while different chats proceed independently.
//!
//! A chat's lock entry lives only while some guard holds or awaits it; the last guard to drop
//! removes it, so the lock map tracks active chats rather than every chat ever seen.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::backend::SessionBackend;
use crate::error::StorageError;
use crate::inmemory::InMemorySessionBackend;
use crate::models::{Session, Turn};

#[derive(Clone)]
pub struct SessionStore {
    backend: Arc<dyn SessionBackend>,
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self {
            backend,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Store backed by [`InMemorySessionBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemorySessionBackend::new()))
    }

    /// Waits for exclusive access to `chat_id`'s session.
    pub async fn lock(&self, chat_id: i64) -> SessionGuard {
        let mutex = self
            .locks
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let permit = mutex.lock_owned().await;
        SessionGuard {
            chat_id,
            backend: self.backend.clone(),
            locks: self.locks.clone(),
            permit: Some(permit),
        }
    }

    /// Chats whose lock is currently held or awaited.
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    // The shortcuts below take the chat lock for one operation; never call them while holding a
    // guard for the same chat.

    pub async fn get_or_create(&self, chat_id: i64) -> Result<Session, StorageError> {
        self.lock(chat_id).await.get_or_create().await
    }

    pub async fn append(&self, chat_id: i64, turn: Turn) -> Result<(), StorageError> {
        self.lock(chat_id).await.append(turn).await
    }

    pub async fn set_facts(&self, chat_id: i64, text: String) -> Result<(), StorageError> {
        self.lock(chat_id).await.set_facts(text).await
    }

    pub async fn clear(&self, chat_id: i64) -> Result<(), StorageError> {
        self.lock(chat_id).await.clear().await
    }

    pub async fn remove_last(&self, chat_id: i64) -> Result<Option<Turn>, StorageError> {
        self.lock(chat_id).await.remove_last().await
    }
}

/// Exclusive handle on one chat's session. Every mutation writes the whole session back.
pub struct SessionGuard {
    chat_id: i64,
    backend: Arc<dyn SessionBackend>,
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
    permit: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.permit.take());
        // Only the map's own reference left: nobody holds or waits for this chat.
        self.locks
            .remove_if(&self.chat_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

impl SessionGuard {
    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    /// The stored session, or a fresh empty one. A missing session is not written until the
    /// first mutation.
    pub async fn get_or_create(&self) -> Result<Session, StorageError> {
        Ok(self.backend.get(self.chat_id).await?.unwrap_or_default())
    }

    async fn update<F, T>(&self, mutate: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Session) -> T + Send,
        T: Send,
    {
        let mut session = self.get_or_create().await?;
        let out = mutate(&mut session);
        self.backend.set(self.chat_id, &session).await?;
        Ok(out)
    }

    pub async fn append(&self, turn: Turn) -> Result<(), StorageError> {
        debug!(chat_id = self.chat_id, role = ?turn.role, "session append");
        self.update(|s| s.messages.push(turn)).await
    }

    pub async fn set_facts(&self, text: String) -> Result<(), StorageError> {
        debug!(chat_id = self.chat_id, len = text.len(), "session set_facts");
        self.update(|s| s.facts = Some(text)).await
    }

    /// Stores the dossier and drops the control placeholder turn in one write.
    pub async fn commit_facts(&self, text: String) -> Result<Option<Turn>, StorageError> {
        debug!(chat_id = self.chat_id, len = text.len(), "session commit_facts");
        self.update(|s| {
            s.facts = Some(text);
            if s.messages.last().is_some_and(Turn::is_control) {
                s.messages.pop()
            } else {
                None
            }
        })
        .await
    }

    /// Replaces the history, keeping the facts.
    pub async fn replace_messages(&self, turns: Vec<Turn>) -> Result<(), StorageError> {
        debug!(chat_id = self.chat_id, turns = turns.len(), "session replace_messages");
        self.update(|s| s.messages = turns).await
    }

    /// Forgets everything: no messages, no facts.
    pub async fn clear(&self) -> Result<(), StorageError> {
        debug!(chat_id = self.chat_id, "session clear");
        self.backend.delete(self.chat_id).await
    }

    /// Pops the most recent turn. An empty history is left untouched.
    pub async fn remove_last(&self) -> Result<Option<Turn>, StorageError> {
        let mut session = self.get_or_create().await?;
        let removed = session.messages.pop();
        if removed.is_some() {
            self.backend.set(self.chat_id, &session).await?;
        }
        debug!(chat_id = self.chat_id, removed = removed.is_some(), "session remove_last");
        Ok(removed)
    }
}
