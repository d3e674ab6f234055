//! Test doubles for the relay: a recording [`Bot`] and a scripted [`LlmClient`].

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dbot_core::{Bot, Chat, Result};
use futures::stream;
use futures::StreamExt;
use llm_client::{ChunkStream, LlmClient, StreamChunk};
use prompt::ChatMessage;
use tokio::sync::mpsc;

/// One recorded outbound call.
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

/// Everything recorded so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<BotEvent>) -> Vec<BotEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Only the message texts, in order.
pub fn messages(events: &[BotEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            BotEvent::Message(_, text) => Some(text.clone()),
            BotEvent::Typing(_) => None,
        })
        .collect()
}

/// LlmClient that replays a fixed script and records every request.
pub struct ScriptedLlm {
    script: Mutex<Vec<anyhow::Result<StreamChunk>>>,
    hang_after_script: bool,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    pub fn new(script: Vec<anyhow::Result<StreamChunk>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            hang_after_script: false,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Successful stream: assistant role, the given fragments, then `stop`.
    pub fn replying(fragments: &[&str]) -> Arc<Self> {
        Self::finishing(fragments, "stop")
    }

    /// Assistant role, the given fragments, then the given finish reason.
    pub fn finishing(fragments: &[&str], reason: &str) -> Arc<Self> {
        let mut script = vec![Ok(StreamChunk::role("assistant"))];
        script.extend(fragments.iter().map(|f| Ok(StreamChunk::text(*f))));
        script.push(Ok(StreamChunk::finish(reason)));
        Self::new(script)
    }

    /// Replays the script, then never yields again.
    pub fn hanging(script: Vec<anyhow::Result<StreamChunk>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            hang_after_script: true,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> anyhow::Result<ChunkStream> {
        self.requests.lock().unwrap().push(messages);
        let items: Vec<anyhow::Result<StreamChunk>> =
            self.script.lock().unwrap().drain(..).collect();
        let replay = stream::iter(items);
        if self.hang_after_script {
            Ok(Box::pin(replay.chain(stream::pending())))
        } else {
            Ok(Box::pin(replay))
        }
    }
}
