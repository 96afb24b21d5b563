//! Transport trait — the abstraction over chat platforms.
//!
//! A Transport connects Snoid to a messaging platform (Discord, the local
//! terminal). It yields inbound messages, serves recent channel history for
//! context assembly, and delivers replies.

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::message::{ChannelId, InboundMessage};

/// The core Transport trait.
///
/// Implementations handle platform-specific connection logic, message
/// formatting, rate limiting, and authentication.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name (e.g., "discord", "cli").
    fn name(&self) -> &str;

    /// The platform user ID the bot itself is known by.
    ///
    /// A message mentioning this ID directly addresses the bot.
    fn self_id(&self) -> &str;

    /// Start listening for incoming messages.
    ///
    /// Returns a receiver that yields inbound messages. The implementation
    /// handles polling or websocket connections internally.
    async fn start(
        &self,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<InboundMessage, ChannelError>>,
        ChannelError,
    >;

    /// Fetch up to `limit` messages posted in `channel` strictly before the
    /// message with ID `before`, newest first.
    async fn fetch_history(
        &self,
        channel: &ChannelId,
        before: &str,
        limit: usize,
    ) -> std::result::Result<Vec<InboundMessage>, ChannelError>;

    /// Send `text` to the channel of `message`, as a reply to it.
    async fn send_reply(
        &self,
        message: &InboundMessage,
        text: &str,
    ) -> std::result::Result<(), ChannelError>;

    /// Show a typing indicator (if the platform supports it).
    async fn send_typing(&self, _channel: &ChannelId) -> std::result::Result<(), ChannelError> {
        Ok(()) // No-op default
    }

    /// Stop the transport gracefully.
    async fn stop(&self) -> std::result::Result<(), ChannelError> {
        Ok(())
    }

    /// Health check — is the transport connected and operational?
    async fn health_check(&self) -> std::result::Result<bool, ChannelError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct SilentTransport;

    #[async_trait]
    impl Transport for SilentTransport {
        fn name(&self) -> &str {
            "silent"
        }

        fn self_id(&self) -> &str {
            "bot"
        }

        async fn start(
            &self,
        ) -> Result<mpsc::Receiver<Result<InboundMessage, ChannelError>>, ChannelError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn fetch_history(
            &self,
            _channel: &ChannelId,
            _before: &str,
            _limit: usize,
        ) -> Result<Vec<InboundMessage>, ChannelError> {
            Ok(vec![])
        }

        async fn send_reply(
            &self,
            _message: &InboundMessage,
            _text: &str,
        ) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn default_methods_are_noops() {
        let transport = SilentTransport;
        assert!(transport.send_typing(&ChannelId::from("c")).await.is_ok());
        assert!(transport.stop().await.is_ok());
        assert!(transport.health_check().await.unwrap());
    }
}
