//! # Handler chain
//!
//! Runs an ordered list of handlers for each inbound message. The first handler that returns
//! `Stop` ends the chain; `Continue` and `Ignore` pass the message on.

use dbot_core::{Handler, HandlerResponse, Message, Result};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Ordered chain of handlers. Cloning is cheap (handlers are shared).
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler; handlers run in insertion order.
    pub fn add_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Runs handlers in order. Returns `Stop` if some handler consumed the message, otherwise
    /// `Continue`. The first handler error aborts the chain and is returned.
    #[instrument(skip(self, message), fields(chat_id = message.chat.id, message_id = %message.id))]
    pub async fn handle(&self, message: &Message) -> Result<HandlerResponse> {
        info!(
            user = %message.user.full_name(),
            "step: handler_chain started"
        );

        for handler in &self.handlers {
            let handler_name = std::any::type_name_of_val(handler.as_ref());
            let response = handler.handle(message).await?;
            debug!(handler = %handler_name, response = ?response, "Handler processed");

            if response == HandlerResponse::Stop {
                info!(handler = %handler_name, "step: handler chain stopped by handler");
                return Ok(HandlerResponse::Stop);
            }
        }

        info!("step: handler_chain finished without a consuming handler");
        Ok(HandlerResponse::Continue)
    }
}
