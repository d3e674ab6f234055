use std::time::Duration;

use dbot_core::DbotError;
use storage::StorageError;
use thiserror::Error;

/// Why a relay turn was abandoned. None of these are retried; nothing is committed to the session.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Called with no turn to answer.
    #[error("relay invoked with an empty history")]
    EmptyHistory,

    /// The request could not be sent, or the stream yielded a transport/decode error.
    #[error("LLM request failed: {0:#}")]
    Llm(anyhow::Error),

    /// The stream carried something the relay cannot accept (e.g. a non-assistant role).
    #[error("stream protocol error: {0}")]
    StreamProtocol(String),

    /// The stream finished for a reason other than `stop` (length, content filter, ...).
    #[error("stream finished with reason {0:?} instead of \"stop\"")]
    UnexpectedFinish(String),

    /// The stream ended without any finish reason.
    #[error("stream ended without a finish reason")]
    Truncated,

    /// No fragment arrived within the idle timeout.
    #[error("no stream fragment within {0:?}")]
    Timeout(Duration),

    #[error("bot error: {0}")]
    Bot(#[from] DbotError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
