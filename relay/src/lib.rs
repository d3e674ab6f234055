//! # relay
//!
//! The streaming relay: sends a chat session's history to the LLM, forwards the reply to the chat
//! one paragraph at a time while it streams, and commits the outcome to the session once the
//! stream has finished normally.
//!
//! A turn whose last message is the control token is a dossier request: nothing is sent while
//! streaming, and the full reply replaces the session's cached facts instead of joining the
//! history.

mod error;
mod paragraph;
mod streaming;

pub use error::RelayError;
pub use paragraph::ParagraphBuffer;
pub use streaming::{RelayOutcome, StreamingRelay, DEFAULT_IDLE_TIMEOUT};
