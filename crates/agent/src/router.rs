//! Message router — classifies each inbound message and drives the reply.
//!
//! ```text
//!   inbound ──► bot author? ──yes──► ignore
//!                  │ no
//!                  ▼
//!             classify ──► DirectAddress ──► forced critique ─┐
//!                  │                              │ error     │
//!                  ├─────► NameGreeting ──► presence ─────────┤
//!                  │                              │ error     │
//!                  └─────► Passive ◄──────────────┘           │
//!                            gate ─yes─► critique ─► sentinel?│
//!                                                             ▼
//!                                                  command dispatch
//! ```
//!
//! Failures in the passive flow are logged and swallowed; a failed direct
//! or greeting reply falls back to the passive flow instead of going silent.

use std::sync::Arc;

use snoid_config::BotConfig;
use snoid_core::channel::Transport;
use snoid_core::command::{CommandDispatcher, NoCommands};
use snoid_core::error::{ChannelError, Error};
use snoid_core::message::InboundMessage;
use snoid_core::provider::CompletionService;
use snoid_providers::CompletionClient;
use snoid_telemetry::PricingTable;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::context::ContextAssembler;
use crate::critique::CritiqueGenerator;
use crate::gate::DecisionGate;
use crate::metered::MeteredClient;
use crate::prompts::SENTINEL;

/// How a message is handled. Decided once per message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionMode {
    /// The message mentions the bot's own user ID.
    DirectAddress,
    /// The bot's name plus a greeting token, without a mention.
    NameGreeting,
    /// Everything else. Subject to the decision gate.
    Passive,
}

impl InteractionMode {
    /// Total over all flag combinations. A mention wins over a greeting.
    pub fn from_flags(mentions_bot: bool, has_name: bool, has_greeting: bool) -> Self {
        if mentions_bot {
            Self::DirectAddress
        } else if has_name && has_greeting {
            Self::NameGreeting
        } else {
            Self::Passive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectAddress => "direct_address",
            Self::NameGreeting => "name_greeting",
            Self::Passive => "passive",
        }
    }
}

impl std::fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of handling one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Bot-authored; nothing was done.
    Ignored,
    /// A reply was sent.
    Replied { mode: InteractionMode, text: String },
    /// Handled without a reply.
    Silent { mode: InteractionMode },
}

/// Whether a passive critique should be withheld.
pub fn is_suppressed(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text == SENTINEL
}

/// Remove any sentinel the model emitted despite being told not to.
pub fn strip_sentinel(text: &str) -> String {
    text.replace(SENTINEL, "").trim().to_string()
}

/// Name and greeting detection, lowercased once at construction.
#[derive(Debug, Clone)]
struct Classifier {
    self_id: String,
    bot_name: String,
    greeting_tokens: Vec<String>,
}

impl Classifier {
    fn new(self_id: &str, bot_name: &str, greeting_tokens: &[String]) -> Self {
        Self {
            self_id: self_id.to_string(),
            bot_name: bot_name.trim().to_lowercase(),
            greeting_tokens: greeting_tokens
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    fn classify(&self, message: &InboundMessage) -> InteractionMode {
        let content = message.content.to_lowercase();
        let has_name = !self.bot_name.is_empty() && content.contains(&self.bot_name);
        let has_greeting = self.greeting_tokens.iter().any(|t| content.contains(t));
        InteractionMode::from_flags(message.mentions_user(&self.self_id), has_name, has_greeting)
    }
}

/// Per-message event handler.
pub struct MessageRouter {
    transport: Arc<dyn Transport>,
    /// Builds the one transcript every model call for a message shares.
    assembler: ContextAssembler,
    history_count: usize,
    gate: DecisionGate,
    critic: CritiqueGenerator,
    dispatcher: Arc<dyn CommandDispatcher>,
    classifier: Classifier,
}

impl MessageRouter {
    /// Wire the pipeline from configuration and shared collaborators.
    pub fn new(
        config: &BotConfig,
        transport: Arc<dyn Transport>,
        service: Arc<dyn CompletionService>,
        pricing: Arc<PricingTable>,
    ) -> Self {
        let assembler =
            ContextAssembler::new(transport.clone()).with_truncate_length(config.truncate_length);
        let client = MeteredClient::new(CompletionClient::new(service), pricing);
        let classifier = Classifier::new(
            transport.self_id(),
            &config.bot_name,
            &config.greeting_tokens,
        );

        Self {
            gate: DecisionGate::new(
                assembler.clone(),
                client.clone(),
                config.cheap_model.clone(),
                config.history_count,
            ),
            critic: CritiqueGenerator::new(
                assembler.clone(),
                client,
                config.expensive_model.clone(),
                config.history_count,
                &config.bot_name,
            ),
            transport,
            assembler,
            history_count: config.history_count,
            dispatcher: Arc::new(NoCommands),
            classifier,
        }
    }

    /// Hand every message to `dispatcher` after bot handling.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn CommandDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Interaction mode for `message`.
    pub fn classify(&self, message: &InboundMessage) -> InteractionMode {
        self.classifier.classify(message)
    }

    /// Handle one inbound message end to end. Never fails.
    pub async fn handle(&self, message: &InboundMessage) -> Outcome {
        if message.is_bot {
            debug!(message_id = %message.id, "Ignoring bot-authored message");
            return Outcome::Ignored;
        }

        let mode = self.classify(message);
        info!(
            message_id = %message.id,
            channel = %message.channel_id,
            author = %message.author_name,
            mode = %mode,
            "Routing message"
        );

        let transcript = self
            .assembler
            .build_context(message, self.history_count)
            .await;

        let reply = match mode {
            InteractionMode::DirectAddress => match self.direct_reply(message, &transcript).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(
                        message_id = %message.id,
                        error = %e,
                        "Direct reply failed, falling back to passive flow"
                    );
                    self.passive_reply(message, &transcript).await
                }
            },
            InteractionMode::NameGreeting => match self.presence_reply(message, &transcript).await {
                Ok(reply) => Some(reply),
                Err(e) => {
                    warn!(
                        message_id = %message.id,
                        error = %e,
                        "Presence reply failed, falling back to passive flow"
                    );
                    self.passive_reply(message, &transcript).await
                }
            },
            InteractionMode::Passive => self.passive_reply(message, &transcript).await,
        };

        self.dispatch_command(message).await;

        match reply {
            Some(text) => Outcome::Replied { mode, text },
            None => Outcome::Silent { mode },
        }
    }

    async fn direct_reply(
        &self,
        message: &InboundMessage,
        transcript: &str,
    ) -> Result<Option<String>, Error> {
        self.typing(message).await;
        let raw = self
            .critic
            .critique_transcript(message, transcript, true)
            .await?;
        let text = strip_sentinel(&raw);
        if text.is_empty() {
            warn!(message_id = %message.id, "Forced critique came back empty, nothing sent");
            return Ok(None);
        }
        self.transport.send_reply(message, &text).await?;
        Ok(Some(text))
    }

    async fn presence_reply(
        &self,
        message: &InboundMessage,
        transcript: &str,
    ) -> Result<String, Error> {
        self.typing(message).await;
        let text = self
            .critic
            .presence_for_transcript(message, transcript)
            .await?;
        self.transport.send_reply(message, &text).await?;
        Ok(text)
    }

    /// Passive flow with all errors contained.
    async fn passive_reply(&self, message: &InboundMessage, transcript: &str) -> Option<String> {
        match self.try_passive(message, transcript).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    message_id = %message.id,
                    channel = %message.channel_id,
                    error = %e,
                    "Passive handling failed, message dropped"
                );
                None
            }
        }
    }

    async fn try_passive(
        &self,
        message: &InboundMessage,
        transcript: &str,
    ) -> Result<Option<String>, Error> {
        if !self
            .gate
            .should_critique_transcript(message, transcript)
            .await?
        {
            return Ok(None);
        }

        self.typing(message).await;
        let text = self
            .critic
            .critique_transcript(message, transcript, false)
            .await?;
        if is_suppressed(&text) {
            debug!(message_id = %message.id, "Critique suppressed");
            return Ok(None);
        }

        let text = text.trim().to_string();
        self.transport.send_reply(message, &text).await?;
        Ok(Some(text))
    }

    async fn typing(&self, message: &InboundMessage) {
        if let Err(e) = self.transport.send_typing(&message.channel_id).await {
            debug!(message_id = %message.id, error = %e, "Typing indicator failed");
        }
    }

    async fn dispatch_command(&self, message: &InboundMessage) {
        let Some(reply) = self.dispatcher.dispatch(message).await else {
            return;
        };
        if let Err(e) = self.transport.send_reply(message, &reply).await {
            warn!(message_id = %message.id, error = %e, "Command reply failed");
        }
    }
}

/// Drain `inbound`, handling each message on its own task.
///
/// Returns once the stream closes and every in-flight message is done.
pub async fn serve(
    router: Arc<MessageRouter>,
    mut inbound: mpsc::Receiver<Result<InboundMessage, ChannelError>>,
) {
    let mut tasks = JoinSet::new();

    while let Some(event) = inbound.recv().await {
        while let Some(done) = tasks.try_join_next() {
            report_task(done);
        }

        match event {
            Ok(message) => {
                let router = router.clone();
                tasks.spawn(async move {
                    router.handle(&message).await;
                });
            }
            Err(e) => warn!(error = %e, "Transport error"),
        }
    }

    info!(in_flight = tasks.len(), "Inbound stream closed");
    while let Some(done) = tasks.join_next().await {
        report_task(done);
    }
}

fn report_task(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "Message task panicked");
    }
}
