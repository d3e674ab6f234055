//! Bot configuration, loaded from the environment (optionally from `.env`).

use anyhow::{anyhow, Context, Result};
use dbot_telegram::TelegramConfig;
use llm_client::EnvLlmConfig;
use std::env;
use std::time::Duration;

pub const DEFAULT_LOG_FILE: &str = "logs/coach-bot.log";
pub const DEFAULT_PERSISTENCE_FILE: &str = "./data/sessions.db";
pub const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 120;

/// Where sessions live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStoreType {
    /// SQLite file at `PERSISTENCE_FILE`; survives restarts.
    Sqlite,
    /// Process memory only.
    Memory,
}

impl SessionStoreType {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!(
                "SESSION_STORE_TYPE must be \"sqlite\" or \"memory\", got {:?}",
                other
            )),
        }
    }
}

/// Everything the bot needs at startup.
#[derive(Debug, Clone)]
pub struct CoachConfig {
    pub telegram: TelegramConfig,
    pub llm: EnvLlmConfig,
    pub bot_name: String,
    pub log_file: String,
    pub session_store_type: SessionStoreType,
    pub persistence_file: String,
    /// `None` waits forever for the next stream fragment.
    pub stream_idle_timeout: Option<Duration>,
    pub debug: bool,
}

impl CoachConfig {
    /// Loads from the environment. If `token` is provided it overrides BOT_TOKEN.
    pub fn load(token: Option<String>) -> Result<Self> {
        let telegram = TelegramConfig::load(token)?;
        let llm = EnvLlmConfig::from_env()?;
        let bot_name = env::var("BOT_NAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("BOT_NAME not set"))?;
        let log_file = telegram
            .log_file
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());
        let session_store_type = match env::var("SESSION_STORE_TYPE") {
            Ok(value) => SessionStoreType::parse(&value)?,
            Err(_) => SessionStoreType::Sqlite,
        };
        let persistence_file = env::var("PERSISTENCE_FILE")
            .unwrap_or_else(|_| DEFAULT_PERSISTENCE_FILE.to_string());
        let idle_secs = match env::var("STREAM_IDLE_TIMEOUT_SECS") {
            Ok(value) => value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid STREAM_IDLE_TIMEOUT_SECS {:?}", value))?,
            Err(_) => DEFAULT_STREAM_IDLE_TIMEOUT_SECS,
        };
        let stream_idle_timeout = (idle_secs > 0).then(|| Duration::from_secs(idle_secs));
        let debug = env::var("DEBUG").map(|v| parse_flag(&v)).unwrap_or(false);

        Ok(Self {
            telegram,
            llm,
            bot_name,
            log_file,
            session_store_type,
            persistence_file,
            stream_idle_timeout,
            debug,
        })
    }
}

/// `yes`, `y`, `on`, `1` and `true` (any case) are true; anything else is false.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "y" | "on" | "1" | "true"
    )
}
