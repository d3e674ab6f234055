//! OpenAI implementation of [`LlmClient`]: converts messages and forwards the fragment stream.

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use prompt::ChatMessage;
use tracing::instrument;

use super::{chat_message_to_openai, ChunkStream, LlmClient, StreamChunk};

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// LlmClient backed by openai-client.
#[derive(Clone)]
pub struct OpenAILlmClient {
    client: openai_client::OpenAIClient,
    model: String,
}

impl OpenAILlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: openai_client::OpenAIClient::new(api_key),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: openai_client::OpenAIClient::with_base_url(api_key, base_url),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for OpenAILlmClient {
    #[instrument(skip(self, messages), fields(model = %self.model, message_count = messages.len()))]
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<ChunkStream> {
        let openai_messages = messages
            .iter()
            .map(chat_message_to_openai)
            .collect::<Result<Vec<_>>>()?;
        let fragments = self
            .client
            .chat_completion_stream(&self.model, openai_messages)
            .await?;
        Ok(Box::pin(
            fragments.map(|item| item.map(StreamChunk::from)),
        ))
    }
}
