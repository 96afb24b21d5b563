//! Prefix commands seen after bot handling (`!ping`, `!price <model>`).

use std::sync::Arc;

use async_trait::async_trait;
use snoid_core::command::CommandDispatcher;
use snoid_core::message::InboundMessage;
use snoid_telemetry::{PricingTable, canonicalize_model};
use tracing::debug;

/// Dispatches `<prefix><name> [args]` commands.
pub struct PrefixCommands {
    prefix: String,
    pricing: Arc<PricingTable>,
}

impl PrefixCommands {
    pub fn new(prefix: impl Into<String>, pricing: Arc<PricingTable>) -> Self {
        Self {
            prefix: prefix.into(),
            pricing,
        }
    }

    fn price_reply(&self, model: &str) -> String {
        if model.is_empty() {
            return format!("Usage: {}price <model>", self.prefix);
        }
        match self.pricing.get(model) {
            Some(p) => format!(
                "{}: ${:.6} per 1K input tokens, ${:.6} per 1K output tokens",
                canonicalize_model(model),
                p.input_per_1k,
                p.output_per_1k
            ),
            None => format!("No pricing known for {model}"),
        }
    }
}

#[async_trait]
impl CommandDispatcher for PrefixCommands {
    async fn dispatch(&self, message: &InboundMessage) -> Option<String> {
        if self.prefix.is_empty() {
            return None;
        }
        let body = message.content.trim().strip_prefix(self.prefix.as_str())?;
        let (name, args) = match body.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (body, ""),
        };

        let reply = match name.to_lowercase().as_str() {
            "ping" => "pong".to_string(),
            "price" => self.price_reply(args),
            _ => return None,
        };
        debug!(message_id = %message.id, command = name, "Command handled");
        Some(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snoid_core::message::ChannelId;

    fn commands() -> PrefixCommands {
        PrefixCommands::new("!", Arc::new(PricingTable::with_defaults()))
    }

    fn msg(content: &str) -> InboundMessage {
        InboundMessage::new("1", ChannelId::from("c"), "alice", content)
    }

    #[tokio::test]
    async fn ping() {
        assert_eq!(commands().dispatch(&msg("!ping")).await.as_deref(), Some("pong"));
        assert_eq!(commands().dispatch(&msg("  !PING ")).await.as_deref(), Some("pong"));
    }

    #[tokio::test]
    async fn price_known_and_unknown() {
        let reply = commands().dispatch(&msg("!price gpt-4o")).await.unwrap();
        assert!(reply.starts_with("gpt-4o: $0.002500 per 1K input"));

        let reply = commands().dispatch(&msg("!price mystery-model")).await.unwrap();
        assert_eq!(reply, "No pricing known for mystery-model");

        let reply = commands().dispatch(&msg("!price")).await.unwrap();
        assert_eq!(reply, "Usage: !price <model>");
    }

    #[tokio::test]
    async fn non_commands_pass_through() {
        assert!(commands().dispatch(&msg("2+2=5")).await.is_none());
        assert!(commands().dispatch(&msg("!unknown")).await.is_none());
        assert!(commands().dispatch(&msg("ping!")).await.is_none());
    }
}
