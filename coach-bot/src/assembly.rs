//! Assembly: builds the session store, LLM client, relay, command table and handler chain from
//! [`CoachConfig`], then runs the REPL.

use anyhow::{Context, Result};
use dbot_core::Bot as CoreBot;
use dbot_telegram::{run_repl, TelegramBotAdapter};
use handler_chain::HandlerChain;
use llm_client::{LlmClient, LlmConfig, OpenAILlmClient};
use prompt::CoachPrompt;
use relay::StreamingRelay;
use std::sync::Arc;
use storage::{SessionStore, SqliteSessionBackend};
use tracing::{info, instrument};

use crate::commands::{coach_commands, CommandTable};
use crate::config::{CoachConfig, SessionStoreType};
use crate::handlers::{CommandRouter, ConversationHandler};

/// Everything the REPL needs, built but not started.
pub struct CoachBot {
    pub chain: HandlerChain,
    pub commands: Arc<CommandTable>,
    pub store: SessionStore,
}

/// Opens the configured session store.
pub async fn create_session_store(config: &CoachConfig) -> Result<SessionStore> {
    match config.session_store_type {
        SessionStoreType::Sqlite => {
            let backend = SqliteSessionBackend::new(&config.persistence_file)
                .await
                .with_context(|| {
                    format!("Failed to open session store {}", config.persistence_file)
                })?;
            info!(path = %config.persistence_file, "Using SQLite session store");
            Ok(SessionStore::new(Arc::new(backend)))
        }
        SessionStoreType::Memory => {
            info!("Using in-memory session store; sessions are lost on restart");
            Ok(SessionStore::in_memory())
        }
    }
}

/// Wires the relay, commands and handlers around the given store, LLM client and bot.
pub fn build_coach_bot(
    config: &CoachConfig,
    store: SessionStore,
    llm_client: Arc<dyn LlmClient>,
    bot: Arc<dyn CoreBot>,
) -> CoachBot {
    let relay = Arc::new(
        StreamingRelay::new(llm_client, bot.clone(), CoachPrompt::new(config.bot_name.clone()))
            .with_idle_timeout(config.stream_idle_timeout)
            .with_debug_stream(config.debug),
    );
    let commands = Arc::new(coach_commands(relay.clone(), bot.clone()));

    let chain = HandlerChain::new()
        .add_handler(Arc::new(CommandRouter::new(
            commands.clone(),
            store.clone(),
            bot.clone(),
        )))
        .add_handler(Arc::new(ConversationHandler::new(store.clone(), relay, bot)));

    CoachBot {
        chain,
        commands,
        store,
    }
}

/// Builds everything from `config` and polls Telegram until shutdown.
#[instrument(skip(config), fields(bot_name = %config.bot_name))]
pub async fn run_bot(config: CoachConfig) -> Result<()> {
    let store = create_session_store(&config).await?;

    let llm_client: Arc<dyn LlmClient> = Arc::new(
        OpenAILlmClient::with_base_url(
            config.llm.api_key().to_string(),
            config.llm.base_url().to_string(),
        )
        .with_model(config.llm.model().to_string()),
    );
    info!(model = %config.llm.model(), base_url = %config.llm.base_url(), "LLM client ready");

    let teloxide_bot = config.telegram.build_bot();
    let bot_adapter: Arc<dyn CoreBot> = Arc::new(TelegramBotAdapter::new(teloxide_bot.clone()));

    let coach = build_coach_bot(&config, store, llm_client, bot_adapter);
    info!(commands = ?coach.commands.names(), "Coach bot assembled");

    run_repl(teloxide_bot, coach.chain, coach.commands.menu()).await
}
