//! Slash commands: parsing, the command table, and the three coach commands.
//!
//! The table is built once at startup ([`coach_commands`]) and handed to the
//! [`CommandRouter`](crate::handlers::CommandRouter); its entries also feed the Telegram command
//! menu.

use anyhow::Result;
use async_trait::async_trait;
use dbot_core::{Bot, Chat, Message};
use dbot_telegram::CommandInfo;
use prompt::CONTROL_TOKEN;
use relay::{RelayOutcome, StreamingRelay};
use std::sync::Arc;
use storage::{SessionGuard, Turn};
use tracing::{info, warn};

pub const CLEAR_SWEEP: &str = "🧹♻️";
pub const CLEAR_CONFIRMATION: &str = "OK, I've forgotten everything about you!";
pub const EMPTY_DOSSIER: &str = "Your dossier is empty.";

/// A `/command` split into name and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub name: &'a str,
    pub args: &'a str,
}

/// Parses `/name`, `/name args` and `/name@botname args`. Returns `None` for plain text.
pub fn parse_command(text: &str) -> Option<ParsedCommand<'_>> {
    let rest = text.trim_start().strip_prefix('/')?;
    let (head, args) = match rest.find(char::is_whitespace) {
        Some(i) => (&rest[..i], rest[i..].trim()),
        None => (rest, ""),
    };
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }
    Some(ParsedCommand { name, args })
}

/// One command. Runs with the chat's session locked for its whole duration.
#[async_trait]
pub trait Command: Send + Sync {
    async fn execute(&self, message: &Message, session: &SessionGuard) -> Result<()>;
}

pub struct CommandEntry {
    pub name: String,
    pub description: String,
    pub command: Arc<dyn Command>,
}

/// Commands by name, in registration order.
#[derive(Default)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a command; a later entry with the same name replaces the earlier one.
    pub fn register(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        command: Arc<dyn Command>,
    ) -> Self {
        let name = name.into();
        self.entries.retain(|e| e.name != name);
        self.entries.push(CommandEntry {
            name,
            description: description.into(),
            command,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Names and descriptions for the client's command menu.
    pub fn menu(&self) -> Vec<CommandInfo> {
        self.entries
            .iter()
            .map(|e| CommandInfo::new(e.name.clone(), e.description.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `/start`, `/dossier` and `/clear`, with descriptions naming the bot.
pub fn coach_commands(relay: Arc<StreamingRelay>, bot: Arc<dyn Bot>) -> CommandTable {
    let bot_name = relay.prompt().bot_name().to_string();
    CommandTable::new()
        .register(
            "start",
            format!("start a new appointment with {}", bot_name),
            Arc::new(StartCommand::new(relay.clone())),
        )
        .register(
            "dossier",
            format!("ask {} for the content of your dossier", bot_name),
            Arc::new(DossierCommand::new(relay, bot.clone())),
        )
        .register(
            "clear",
            format!("{} will forget everything about you", bot_name),
            Arc::new(ClearCommand::new(bot)),
        )
}

/// Runs the relay on the guarded session. When the turn fails and the history still ends with
/// the dossier placeholder, the placeholder is removed so it never outlives its own turn.
pub(crate) async fn relay_turn(
    relay: &StreamingRelay,
    chat: &Chat,
    session: &SessionGuard,
) -> Result<RelayOutcome> {
    match relay.run(chat, session).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            let state = session.get_or_create().await?;
            if state.last_turn().is_some_and(Turn::is_control) {
                session.remove_last().await?;
                info!(chat_id = session.chat_id(), "Dropped dossier placeholder after failed turn");
            }
            Err(e.into())
        }
    }
}

/// Shows a freshly stored dossier; an empty one gets [`EMPTY_DOSSIER`] instead.
pub(crate) async fn send_dossier(bot: &dyn Bot, chat: &Chat, facts: &str) -> Result<()> {
    if facts.trim().is_empty() {
        bot.send_message(chat, EMPTY_DOSSIER).await?;
    } else {
        bot.send_message(chat, facts).await?;
    }
    info!(chat_id = chat.id, facts_len = facts.len(), "Dossier sent");
    Ok(())
}

/// Starts a new appointment: history becomes the greeting alone (facts are kept), then the
/// coach answers it.
pub struct StartCommand {
    relay: Arc<StreamingRelay>,
}

impl StartCommand {
    pub fn new(relay: Arc<StreamingRelay>) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl Command for StartCommand {
    async fn execute(&self, message: &Message, session: &SessionGuard) -> Result<()> {
        let greeting = self.relay.prompt().greeting();
        session.replace_messages(vec![Turn::user(greeting)]).await?;
        relay_turn(&self.relay, &message.chat, session).await?;
        Ok(())
    }
}

/// Asks the coach for the dossier, stores it as the session's facts and shows it.
pub struct DossierCommand {
    relay: Arc<StreamingRelay>,
    bot: Arc<dyn Bot>,
}

impl DossierCommand {
    pub fn new(relay: Arc<StreamingRelay>, bot: Arc<dyn Bot>) -> Self {
        Self { relay, bot }
    }
}

#[async_trait]
impl Command for DossierCommand {
    async fn execute(&self, message: &Message, session: &SessionGuard) -> Result<()> {
        session.append(Turn::user(CONTROL_TOKEN)).await?;

        match relay_turn(&self.relay, &message.chat, session).await? {
            RelayOutcome::FactsStored { facts } => {
                send_dossier(self.bot.as_ref(), &message.chat, &facts).await
            }
            RelayOutcome::Replied { .. } => {
                warn!(chat_id = session.chat_id(), "Dossier request was answered as a normal turn");
                Ok(())
            }
        }
    }
}

/// Forgets the session entirely (history and facts).
pub struct ClearCommand {
    bot: Arc<dyn Bot>,
}

impl ClearCommand {
    pub fn new(bot: Arc<dyn Bot>) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Command for ClearCommand {
    async fn execute(&self, message: &Message, session: &SessionGuard) -> Result<()> {
        session.clear().await?;
        self.bot.send_message(&message.chat, CLEAR_SWEEP).await?;
        self.bot.send_message(&message.chat, CLEAR_CONFIRMATION).await?;
        Ok(())
    }
}
