//! # coach_bot
//!
//! Business-coach Telegram bot. Plain text is relayed to the LLM paragraph by paragraph;
//! `/start`, `/dossier` and `/clear` manage the chat's session. Entry points: [`CoachConfig::load`]
//! and [`run_bot`]; [`build_coach_bot`] wires the same chain without Telegram for tests.

mod assembly;
pub mod cli;
pub mod commands;
pub mod config;
pub mod handlers;

pub use assembly::{build_coach_bot, create_session_store, run_bot, CoachBot};
pub use cli::{Cli, Commands};
pub use commands::{coach_commands, parse_command, Command, CommandTable};
pub use config::{CoachConfig, SessionStoreType};
pub use handlers::{CommandRouter, ConversationHandler, MSG_TURN_FAILED};
