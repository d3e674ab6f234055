//! REPL runner: registers the bot's commands, then converts each teloxide text message to
//! core::Message and runs the HandlerChain on it.
//!
//! The REPL dispatcher handles one update per chat at a time (different chats concurrently), so
//! awaiting the chain inside the update handler keeps each chat's turns in arrival order.

use anyhow::Result;
use dbot_core::{Message, ToCoreMessage};
use handler_chain::HandlerChain;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use tracing::{error, info, instrument, warn};

use super::adapters::TelegramMessageWrapper;

/// A command as shown in the Telegram client menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub name: String,
    pub description: String,
}

impl CommandInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Runs the chain on one message and waits for it. Chain errors are logged, not returned, so
/// one failed update never stops the REPL.
pub async fn dispatch_message(chain: &HandlerChain, message: &Message) {
    if let Err(e) = chain.handle(message).await {
        error!(
            error = %e,
            chat_id = message.chat.id,
            user_id = message.user.id,
            "Handler chain failed"
        );
    }
}

/// Registers `commands` with Telegram, then runs the REPL until shutdown.
/// A failed registration is logged; polling starts regardless.
#[instrument(skip(bot, handler_chain, commands))]
pub async fn run_repl(
    bot: teloxide::Bot,
    handler_chain: HandlerChain,
    commands: Vec<CommandInfo>,
) -> Result<()> {
    let bot_commands: Vec<BotCommand> = commands
        .iter()
        .map(|c| BotCommand::new(c.name.clone(), c.description.clone()))
        .collect();
    match bot.set_my_commands(bot_commands).await {
        Ok(_) => info!(count = commands.len(), "Bot commands registered"),
        Err(e) => warn!(error = %e, "Failed to register bot commands"),
    }

    if let Ok(me) = bot.get_me().await {
        if let Some(username) = &me.user.username {
            info!(username = %username, "Starting REPL");
        }
    }

    let chain = handler_chain;
    teloxide::repl(
        bot,
        move |_bot: Bot, msg: teloxide::types::Message| {
            let chain = chain.clone();

            async move {
                let core_msg = TelegramMessageWrapper(&msg).to_core();

                if msg.text().is_none() {
                    info!(
                        user_id = core_msg.user.id,
                        chat_id = core_msg.chat.id,
                        "Ignoring non-text message"
                    );
                    return Ok(());
                }
                info!(
                    user_id = core_msg.user.id,
                    chat_id = core_msg.chat.id,
                    message_content = %core_msg.content,
                    "Received message"
                );

                dispatch_message(&chain, &core_msg).await;
                Ok(())
            }
        },
    )
    .await;

    Ok(())
}
