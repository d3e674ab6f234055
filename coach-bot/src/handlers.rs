//! Chain handlers: [`CommandRouter`] for `/commands`, [`ConversationHandler`] for plain text.
//!
//! Both hold the chat's session guard for the whole turn and both answer a failed turn with
//! [`MSG_TURN_FAILED`]. Nothing is retried.

use async_trait::async_trait;
use dbot_core::{Bot as CoreBot, Handler, HandlerResponse, Message, Result};
use relay::{RelayOutcome, StreamingRelay};
use std::sync::Arc;
use storage::{SessionStore, Turn};
use tracing::{error, info, instrument, warn};

use crate::commands::{parse_command, relay_turn, send_dossier, CommandTable};

/// Sent after a turn was abandoned (paragraphs already sent stay visible).
pub const MSG_TURN_FAILED: &str = "Sorry, something went wrong on my side. Please try again.";

async fn report_failure(bot: &dyn CoreBot, message: &Message, err: &anyhow::Error) {
    error!(
        error = %format!("{:#}", err),
        chat_id = message.chat.id,
        user = %message.user.full_name(),
        "Turn failed"
    );
    if let Err(e) = bot.send_message(&message.chat, MSG_TURN_FAILED).await {
        warn!(error = %e, chat_id = message.chat.id, "Failed to send failure notice");
    }
}

/// Dispatches `/name[@bot] args` messages through the [`CommandTable`]. Unknown commands are
/// logged and swallowed; plain text passes on.
pub struct CommandRouter {
    table: Arc<CommandTable>,
    store: SessionStore,
    bot: Arc<dyn CoreBot>,
}

impl CommandRouter {
    pub fn new(table: Arc<CommandTable>, store: SessionStore, bot: Arc<dyn CoreBot>) -> Self {
        Self { table, store, bot }
    }
}

#[async_trait]
impl Handler for CommandRouter {
    #[instrument(skip(self, message), fields(chat_id = message.chat.id))]
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        let Some(parsed) = parse_command(&message.content) else {
            return Ok(HandlerResponse::Continue);
        };

        let Some(entry) = self.table.get(parsed.name) else {
            info!(
                command = parsed.name,
                user = %message.user.full_name(),
                "Ignoring unknown command"
            );
            return Ok(HandlerResponse::Stop);
        };

        info!(
            command = parsed.name,
            user = %message.user.full_name(),
            "Processing command"
        );
        let session = self.store.lock(message.chat.id).await;
        if let Err(e) = entry.command.execute(message, &session).await {
            report_failure(self.bot.as_ref(), message, &e).await;
        }
        Ok(HandlerResponse::Stop)
    }
}

/// Appends plain text as a user turn and relays the coach's answer.
pub struct ConversationHandler {
    store: SessionStore,
    relay: Arc<StreamingRelay>,
    bot: Arc<dyn CoreBot>,
}

impl ConversationHandler {
    pub fn new(store: SessionStore, relay: Arc<StreamingRelay>, bot: Arc<dyn CoreBot>) -> Self {
        Self { store, relay, bot }
    }

    async fn converse(&self, message: &Message) -> anyhow::Result<()> {
        let session = self.store.lock(message.chat.id).await;
        session.append(Turn::user(message.content.clone())).await?;
        match relay_turn(&self.relay, &message.chat, &session).await? {
            // A lone control token typed as text is a dossier request like `/dossier`.
            RelayOutcome::FactsStored { facts } => {
                info!(chat_id = message.chat.id, "Dossier stored from plain text");
                send_dossier(self.bot.as_ref(), &message.chat, &facts).await
            }
            RelayOutcome::Replied { .. } => Ok(()),
        }
    }
}

#[async_trait]
impl Handler for ConversationHandler {
    #[instrument(skip(self, message), fields(chat_id = message.chat.id))]
    async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        if message.content.is_empty() {
            return Ok(HandlerResponse::Ignore);
        }
        if let Err(e) = self.converse(message).await {
            report_failure(self.bot.as_ref(), message, &e).await;
        }
        Ok(HandlerResponse::Stop)
    }
}
