//! # LLM client abstraction
//!
//! Defines the [`LlmClient`] trait and an OpenAI implementation. The relay consumes completions
//! as a cooperative stream of [`StreamChunk`]s; the trait returns a boxed stream so it stays
//! object safe (`Arc<dyn LlmClient>`).

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use openai_client::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    StreamFragment,
};
use prompt::{ChatMessage, MessageRole};
use std::pin::Pin;

mod config;
mod openai_llm;

pub use config::{EnvLlmConfig, LlmConfig};
pub use openai_llm::OpenAILlmClient;

/// A fragment of streamed LLM output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    /// Role marker (expected `"assistant"`), usually only on the first chunk.
    pub role: Option<String>,
    /// Text delta.
    pub content: Option<String>,
    /// `None` until the last chunk; a normal end carries `"stop"`.
    pub finish_reason: Option<String>,
    /// Unexpected structured delta fields carried by this chunk.
    pub extra_fields: Vec<String>,
}

impl StreamChunk {
    /// Chunk carrying only a role marker.
    pub fn role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            ..Default::default()
        }
    }

    /// Chunk carrying only text.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Final chunk with the given finish reason.
    pub fn finish(reason: impl Into<String>) -> Self {
        Self {
            finish_reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

impl From<StreamFragment> for StreamChunk {
    fn from(fragment: StreamFragment) -> Self {
        Self {
            role: fragment.role,
            content: fragment.content,
            finish_reason: fragment.finish_reason,
            extra_fields: fragment.extra_fields.into_iter().map(String::from).collect(),
        }
    }
}

/// Boxed stream of chunks; errors after the request was accepted arrive as `Err` items.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// LLM client interface: streamed completion for a full message list (system first).
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Starts a streamed completion for `messages` and returns the chunk stream.
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<ChunkStream>;
}

/// Converts a single [`ChatMessage`] into OpenAI API message format.
fn chat_message_to_openai(msg: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let content = msg.content.clone();
    let openai_msg: ChatCompletionRequestMessage = match msg.role {
        MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(openai_msg)
}
