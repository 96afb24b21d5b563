//! Downstream command dispatch.
//!
//! After the bot-specific handling of a message finishes, the message is
//! handed to a [`CommandDispatcher`] so prefix commands still see it.

use async_trait::async_trait;

use crate::message::InboundMessage;

#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    /// Inspect a message and optionally produce a reply to send back.
    async fn dispatch(&self, message: &InboundMessage) -> Option<String>;
}

/// A dispatcher that recognises no commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCommands;

#[async_trait]
impl CommandDispatcher for NoCommands {
    async fn dispatch(&self, _message: &InboundMessage) -> Option<String> {
        None
    }
}
