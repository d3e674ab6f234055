//! # OpenAI API client
//!
//! Thin wrapper around [async-openai] for streamed chat completion. Each API chunk is flattened
//! into a [`StreamFragment`] (role marker, text, finish reason, names of any extra delta fields)
//! so callers never touch async-openai types. Also provides token masking for safe logging.

use async_openai::types::{
    ChatChoiceStream, CreateChatCompletionRequestArgs, CreateChatCompletionStreamResponse,
    FinishReason, Role,
};
use async_openai::Client;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;

pub use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};

/// Masks an API key/token for safe logging: first 7 chars + "***" + last 4 chars.
/// Tokens of 11 chars or fewer become "***" so no segment leaks.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 11 {
        return "***".to_string();
    }
    let head: String = chars[..7].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", head, tail)
}

/// One streamed piece of a completion, detached from the wire types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFragment {
    /// Role marker; the API sends `"assistant"` on the first fragment only.
    pub role: Option<String>,
    /// Text delta, if any.
    pub content: Option<String>,
    /// Terminal marker; `None` until the final fragment (`"stop"`, `"length"`, ...).
    pub finish_reason: Option<String>,
    /// Delta fields present besides role and content (e.g. `tool_calls`, `refusal`).
    pub extra_fields: Vec<&'static str>,
}

/// Stream of fragments for one completion. Transport and decode errors are items of the stream.
pub type FragmentStream = Pin<Box<dyn Stream<Item = anyhow::Result<StreamFragment>> + Send>>;

fn role_name(role: &Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
        Role::Function => "function",
    }
}

fn finish_reason_name(reason: &FinishReason) -> &'static str {
    match reason {
        FinishReason::Stop => "stop",
        FinishReason::Length => "length",
        FinishReason::ToolCalls => "tool_calls",
        FinishReason::ContentFilter => "content_filter",
        FinishReason::FunctionCall => "function_call",
    }
}

#[allow(deprecated)]
fn fragment_from_choice(choice: &ChatChoiceStream) -> StreamFragment {
    let delta = &choice.delta;
    let mut extra_fields = Vec::new();
    if delta.tool_calls.is_some() {
        extra_fields.push("tool_calls");
    }
    if delta.function_call.is_some() {
        extra_fields.push("function_call");
    }
    if delta.refusal.is_some() {
        extra_fields.push("refusal");
    }
    StreamFragment {
        role: delta.role.as_ref().map(role_name).map(String::from),
        content: delta.content.clone(),
        finish_reason: choice.finish_reason.as_ref().map(finish_reason_name).map(String::from),
        extra_fields,
    }
}

/// Flattens one API chunk. Chunks without choices (usage-only) yield an empty fragment.
fn fragment_from_chunk(chunk: &CreateChatCompletionStreamResponse) -> StreamFragment {
    if let Some(ref u) = chunk.usage {
        tracing::info!(
            prompt_tokens = u.prompt_tokens,
            completion_tokens = u.completion_tokens,
            total_tokens = u.total_tokens,
            "OpenAI chat_completion_stream usage"
        );
    }
    chunk
        .choices
        .first()
        .map(fragment_from_choice)
        .unwrap_or_default()
}

/// OpenAI chat client. Wraps async-openai client; holds the API key for masked logging.
#[derive(Clone)]
pub struct OpenAIClient {
    client: Arc<Client<async_openai::config::OpenAIConfig>>,
    /// API key stored only for logging (masked).
    api_key_for_logging: String,
}

impl OpenAIClient {
    /// Builds a client using the given API key and default API base URL.
    pub fn new(api_key: String) -> Self {
        let api_key_for_logging = api_key.clone();
        let config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Arc::new(Client::with_config(config)),
            api_key_for_logging,
        }
    }

    /// Builds a client with a custom base URL (proxies or compatible endpoints).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let api_key_for_logging = api_key.clone();
        let config = async_openai::config::OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self {
            client: Arc::new(Client::with_config(config)),
            api_key_for_logging,
        }
    }

    fn masked_key(&self) -> String {
        mask_token(&self.api_key_for_logging)
    }

    /// Opens a streamed chat completion (`stream: true`) and returns its fragments in order.
    ///
    /// Request construction and connection errors are returned directly; errors after the stream
    /// is open arrive as `Err` items.
    pub async fn chat_completion_stream(
        &self,
        model: &str,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> anyhow::Result<FragmentStream> {
        tracing::info!(
            model = %model,
            message_count = messages.len(),
            api_key = %self.masked_key(),
            "OpenAI chat_completion_stream request"
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(messages)
            .stream(true)
            .build()?;

        if let Ok(json) = serde_json::to_string_pretty(&request) {
            tracing::debug!(request_json = %json, "OpenAI chat_completion_stream request JSON");
        }

        let stream = self.client.chat().create_stream(request).await?;

        Ok(Box::pin(stream.map(|item| match item {
            Ok(chunk) => Ok(fragment_from_chunk(&chunk)),
            Err(e) => Err(anyhow::anyhow!("Stream error: {}", e)),
        })))
    }
}
