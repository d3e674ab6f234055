//! Session model: the durable per-chat conversation state.
//!
//! Serialized as one JSON document per chat by the SQLite backend.

use prompt::{is_control_message, ChatMessage};
use serde::{Deserialize, Serialize};

/// Author of a stored turn. System messages are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }

    /// True for the dossier placeholder (a user turn that is exactly the control token).
    pub fn is_control(&self) -> bool {
        self.role == TurnRole::User && is_control_message(&self.content)
    }

    pub fn to_chat_message(&self) -> ChatMessage {
        match self.role {
            TurnRole::User => ChatMessage::user(self.content.clone()),
            TurnRole::Assistant => ChatMessage::assistant(self.content.clone()),
        }
    }
}

/// Conversation state of one chat: history plus the cached dossier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub messages: Vec<Turn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<String>,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.facts.is_none()
    }

    pub fn last_turn(&self) -> Option<&Turn> {
        self.messages.last()
    }
}
