//! Outbound side of a chat transport.
//!
//! [`Bot`] is transport-agnostic; dbot-telegram implements it via teloxide and tests substitute
//! a recording mock.

use crate::error::Result;
use crate::types::Chat;
use async_trait::async_trait;

/// Abstraction for everything the relay sends back to a chat: plain-text messages and the
/// "composing" activity indicator.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Sends a plain-text message to the given chat.
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()>;

    /// Signals that a reply is being composed (Telegram shows "typing…" for a few seconds).
    async fn send_typing(&self, chat: &Chat) -> Result<()>;
}
