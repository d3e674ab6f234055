//! # dbot-core
//!
//! Core types and traits for the coaching bot: [`Bot`], [`Handler`], message/user/chat types,
//! and tracing initialization. Transport-agnostic; used by dbot-telegram, handler-chain and relay.

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::Bot;
pub use error::{DbotError, Result};
pub use logger::{init_tracing, init_tracing_with_default};
pub use types::{Chat, Handler, HandlerResponse, Message, ToCoreMessage, ToCoreUser, User};
