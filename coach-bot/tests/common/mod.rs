//! Shared fixtures: recording bot, queued LLM replies, test config and message builders.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use coach_bot::{CoachConfig, SessionStoreType};
use dbot_core::{Bot, Chat, Message, Result, User};
use dbot_telegram::TelegramConfig;
use futures::stream;
use llm_client::{ChunkStream, EnvLlmConfig, LlmClient, StreamChunk};
use prompt::ChatMessage;
use tokio::sync::mpsc;

pub const CHAT_ID: i64 = 42;
pub const BOT_NAME: &str = "Marvin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent {
    Typing(i64),
    Message(i64, String),
}

/// Mock Bot that forwards every outbound call to a channel held by the test.
pub struct MockBot {
    tx: mpsc::UnboundedSender<BotEvent>,
}

impl MockBot {
    pub fn with_receiver() -> (Arc<Self>, mpsc::UnboundedReceiver<BotEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Bot for MockBot {
    async fn send_message(&self, chat: &Chat, text: &str) -> Result<()> {
        let _ = self.tx.send(BotEvent::Message(chat.id, text.to_string()));
        Ok(())
    }

    async fn send_typing(&self, chat: &Chat) -> Result<()> {
        let _ = self.tx.send(BotEvent::Typing(chat.id));
        Ok(())
    }
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<BotEvent>) -> Vec<BotEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn messages(events: &[BotEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            BotEvent::Message(_, text) => Some(text.clone()),
            BotEvent::Typing(_) => None,
        })
        .collect()
}

pub type Script = Vec<anyhow::Result<StreamChunk>>;

/// Assistant role, the fragments, then the finish reason.
pub fn script(fragments: &[&str], finish_reason: &str) -> Script {
    let mut items = vec![Ok(StreamChunk::role("assistant"))];
    items.extend(fragments.iter().map(|f| Ok(StreamChunk::text(*f))));
    items.push(Ok(StreamChunk::finish(finish_reason)));
    items
}

/// LlmClient answering each request with the next queued script. Records requests.
pub struct QueuedLlm {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl QueuedLlm {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for QueuedLlm {
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<ChunkStream> {
        self.requests.lock().unwrap().push(messages);
        let next = self.scripts.lock().unwrap().pop_front();
        match next {
            Some(items) => Ok(Box::pin(stream::iter(items))),
            None => Err(anyhow::anyhow!("no scripted reply left")),
        }
    }
}

pub fn test_config(store_type: SessionStoreType, persistence_file: &str) -> CoachConfig {
    CoachConfig {
        telegram: TelegramConfig::with_token("test_token".to_string()),
        llm: EnvLlmConfig {
            openai_api_key: "sk-test".to_string(),
            openai_base_url: "http://localhost:0/v1".to_string(),
            llm_model: "gpt-3.5-turbo".to_string(),
        },
        bot_name: BOT_NAME.to_string(),
        log_file: "logs/test.log".to_string(),
        session_store_type: store_type,
        persistence_file: persistence_file.to_string(),
        stream_idle_timeout: Some(std::time::Duration::from_secs(5)),
        debug: false,
    }
}

pub fn text_message(content: &str) -> Message {
    Message {
        id: "1".to_string(),
        user: User {
            id: 7,
            username: Some("alex".to_string()),
            first_name: Some("Alex".to_string()),
            last_name: None,
        },
        chat: Chat {
            id: CHAT_ID,
            chat_type: "private".to_string(),
        },
        content: content.to_string(),
        created_at: chrono::Utc::now(),
    }
}
