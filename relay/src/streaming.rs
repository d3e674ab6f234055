//! Streaming relay: one LLM call per turn, paragraphs forwarded as they complete.

use std::sync::Arc;
use std::time::Duration;

use dbot_core::{Bot, Chat};
use futures::StreamExt;
use llm_client::{ChunkStream, LlmClient, StreamChunk};
use prompt::CoachPrompt;
use storage::{SessionGuard, Turn};
use tracing::{debug, info, instrument, warn};

use crate::error::RelayError;
use crate::paragraph::ParagraphBuffer;

/// Default limit on the wait for the next stream fragment.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Only finish reason that counts as a complete reply.
const FINISH_STOP: &str = "stop";

/// Only role the model may announce.
const ASSISTANT_ROLE: &str = "assistant";

/// What a successful relay call committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Normal turn: `paragraphs` messages were sent and the reply was appended to the history.
    Replied {
        full_response: String,
        paragraphs: usize,
    },
    /// Dossier turn: the reply became the session's facts and the placeholder turn was dropped.
    FactsStored { facts: String },
}

/// Sends a session's history to the LLM and relays the streamed reply to the chat.
///
/// **External interactions:** [`LlmClient`] (streamed completion), [`Bot`] (typing indicator and
/// paragraph messages), [`SessionGuard`] (read history, commit the outcome).
#[derive(Clone)]
pub struct StreamingRelay {
    llm_client: Arc<dyn LlmClient>,
    bot: Arc<dyn Bot>,
    prompt: CoachPrompt,
    idle_timeout: Option<Duration>,
    debug_stream: bool,
}

impl StreamingRelay {
    pub fn new(llm_client: Arc<dyn LlmClient>, bot: Arc<dyn Bot>, prompt: CoachPrompt) -> Self {
        Self {
            llm_client,
            bot,
            prompt,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            debug_stream: false,
        }
    }

    /// Bounds the wait for each fragment; `None` waits forever.
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Logs every received fragment at debug level.
    pub fn with_debug_stream(mut self, debug_stream: bool) -> Self {
        self.debug_stream = debug_stream;
        self
    }

    pub fn prompt(&self) -> &CoachPrompt {
        &self.prompt
    }

    /// Answers the last turn of the guarded session.
    ///
    /// The session is read once at the start and written once after the stream finished with
    /// `stop`. On any error nothing is written; paragraphs already sent stay sent.
    #[instrument(skip(self, chat, session), fields(chat_id = chat.id))]
    pub async fn run(
        &self,
        chat: &Chat,
        session: &SessionGuard,
    ) -> Result<RelayOutcome, RelayError> {
        self.bot.send_typing(chat).await?;

        let state = session.get_or_create().await?;
        let last_turn = state.last_turn().ok_or(RelayError::EmptyHistory)?;
        let is_control_turn = last_turn.is_control();

        let request = self.prompt.compose_request(
            state.facts.as_deref(),
            state.messages.iter().map(Turn::to_chat_message),
        );
        info!(
            message_count = request.len(),
            has_facts = state.facts.is_some(),
            is_control_turn = is_control_turn,
            "Submitting to LLM (streaming)"
        );

        let mut stream = self
            .llm_client
            .stream_chat(request)
            .await
            .map_err(RelayError::Llm)?;

        let mut buffer = ParagraphBuffer::new(!is_control_turn);
        let mut paragraphs = 0usize;

        loop {
            let chunk = self.next_chunk(&mut stream).await?;

            if let Some(role) = chunk.role.as_deref() {
                if role != ASSISTANT_ROLE {
                    return Err(RelayError::StreamProtocol(format!(
                        "unexpected role {:?} in stream",
                        role
                    )));
                }
            }
            if !chunk.extra_fields.is_empty() {
                return Err(RelayError::StreamProtocol(format!(
                    "unexpected fields {:?} in stream delta",
                    chunk.extra_fields
                )));
            }

            if let Some(text) = chunk.content.as_deref() {
                if self.debug_stream {
                    debug!(fragment = %text, "stream fragment");
                }
                if let Some(paragraph) = buffer.push(text) {
                    self.bot.send_message(chat, &paragraph).await?;
                    paragraphs += 1;
                    debug!(paragraph_len = paragraph.len(), "Paragraph sent");
                    self.bot.send_typing(chat).await?;
                }
            }

            if let Some(reason) = chunk.finish_reason {
                if reason != FINISH_STOP {
                    warn!(
                        finish_reason = %reason,
                        received_len = buffer.full_response().len(),
                        "LLM stream finished abnormally"
                    );
                    return Err(RelayError::UnexpectedFinish(reason));
                }
                break;
            }
        }

        let (full_response, trailing) = buffer.finish();

        if is_control_turn {
            session.commit_facts(full_response.clone()).await?;
            info!(facts_len = full_response.len(), "Dossier stored");
            return Ok(RelayOutcome::FactsStored {
                facts: full_response,
            });
        }

        if let Some(paragraph) = trailing {
            self.bot.send_message(chat, &paragraph).await?;
            paragraphs += 1;
        }
        session.append(Turn::assistant(full_response.clone())).await?;
        info!(
            paragraphs = paragraphs,
            response_len = full_response.len(),
            "LLM reply relayed"
        );

        Ok(RelayOutcome::Replied {
            full_response,
            paragraphs,
        })
    }

    /// Next chunk of the stream, honouring the idle timeout. End of stream is an error: a
    /// complete reply always ends with a finish reason first.
    async fn next_chunk(&self, stream: &mut ChunkStream) -> Result<StreamChunk, RelayError> {
        let next = match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, stream.next())
                .await
                .map_err(|_| RelayError::Timeout(limit))?,
            None => stream.next().await,
        };
        match next {
            Some(item) => item.map_err(RelayError::Llm),
            None => Err(RelayError::Truncated),
        }
    }
}
