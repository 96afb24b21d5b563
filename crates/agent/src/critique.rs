//! Critique and presence replies on the expensive tier.

use snoid_core::error::ProviderError;
use snoid_core::message::InboundMessage;
use snoid_telemetry::CallPurpose;
use tracing::debug;

use crate::context::ContextAssembler;
use crate::metered::MeteredClient;
use crate::prompts;

/// Writes replies in the bot's persona.
pub struct CritiqueGenerator {
    assembler: ContextAssembler,
    client: MeteredClient,
    /// Expensive-tier model identifier.
    model: String,
    history_count: usize,
    persona: String,
}

impl CritiqueGenerator {
    pub fn new(
        assembler: ContextAssembler,
        client: MeteredClient,
        model: impl Into<String>,
        history_count: usize,
        bot_name: &str,
    ) -> Self {
        Self {
            assembler,
            client,
            model: model.into(),
            history_count,
            persona: prompts::persona_name(bot_name),
        }
    }

    /// Critique the final line of the transcript in at most two sentences.
    ///
    /// Without `force_response` the model may answer with
    /// [`prompts::SENTINEL`]; the text is returned as-is and the caller
    /// decides what to send.
    pub async fn craft_critique(
        &self,
        message: &InboundMessage,
        force_response: bool,
    ) -> Result<String, ProviderError> {
        let transcript = self
            .assembler
            .build_context(message, self.history_count)
            .await;
        self.critique_transcript(message, &transcript, force_response)
            .await
    }

    pub async fn critique_transcript(
        &self,
        message: &InboundMessage,
        transcript: &str,
        force_response: bool,
    ) -> Result<String, ProviderError> {
        let prompt = prompts::critique_prompt(&self.persona, transcript, force_response);
        let result = self
            .client
            .call(CallPurpose::Critique, &self.model, &prompt, &message.id)
            .await?;

        debug!(
            message_id = %message.id,
            force_response,
            reply_len = result.text.len(),
            "Critique generated"
        );
        Ok(result.text)
    }

    /// One-sentence acknowledgement of a greeting. Never empty.
    pub async fn craft_presence(&self, message: &InboundMessage) -> Result<String, ProviderError> {
        let transcript = self
            .assembler
            .build_context(message, self.history_count)
            .await;
        self.presence_for_transcript(message, &transcript).await
    }

    pub async fn presence_for_transcript(
        &self,
        message: &InboundMessage,
        transcript: &str,
    ) -> Result<String, ProviderError> {
        let prompt = prompts::presence_prompt(&self.persona, transcript);
        let result = self
            .client
            .call(CallPurpose::Presence, &self.model, &prompt, &message.id)
            .await?;

        if result.text.is_empty() {
            debug!(message_id = %message.id, "Empty presence reply, using fallback");
            return Ok(prompts::PRESENCE_FALLBACK.to_string());
        }
        Ok(result.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::test_helpers::{
        RecordingTransport, ScriptedService, empty_response, human, metered, text_response,
    };

    fn generator(service: Arc<ScriptedService>) -> CritiqueGenerator {
        let assembler = ContextAssembler::new(Arc::new(RecordingTransport::default()));
        CritiqueGenerator::new(assembler, metered(service), "gpt-4o", 9, "snoid")
    }

    #[tokio::test]
    async fn critique_uses_expensive_model() {
        let service = Arc::new(ScriptedService::new(vec![text_response(
            "  Wrong. It is 4.  ",
        )]));
        let generator = generator(service.clone());

        let reply = generator
            .craft_critique(&human("1", "alice", "2+2=5"), false)
            .await
            .unwrap();
        assert_eq!(reply, "Wrong. It is 4.");

        let requests = service.requests();
        assert_eq!(requests[0].model, "gpt-4o");
        assert!(requests[0].prompt.starts_with("You are Snoid"));
        assert!(requests[0].prompt.contains("and nothing else"));
    }

    #[tokio::test]
    async fn forced_critique_changes_prompt() {
        let service = Arc::new(ScriptedService::new(vec![text_response("Objectively wrong.")]));
        let generator = generator(service.clone());

        generator
            .craft_critique(&human("1", "alice", "pineapple belongs on pizza"), true)
            .await
            .unwrap();
        assert!(service.requests()[0].prompt.contains("must reply"));
    }

    #[tokio::test]
    async fn sentinel_is_passed_through_to_caller() {
        let service = Arc::new(ScriptedService::new(vec![text_response(prompts::SENTINEL)]));
        let generator = generator(service);

        let reply = generator
            .craft_critique(&human("1", "alice", "the sky is blue"), false)
            .await
            .unwrap();
        assert_eq!(reply, prompts::SENTINEL);
    }

    #[tokio::test]
    async fn empty_presence_uses_fallback() {
        let service = Arc::new(ScriptedService::new(vec![empty_response()]));
        let generator = generator(service);

        let reply = generator
            .craft_presence(&human("1", "bob", "hey snoid"))
            .await
            .unwrap();
        assert_eq!(reply, prompts::PRESENCE_FALLBACK);
    }

    #[tokio::test]
    async fn presence_keeps_model_text() {
        let service = Arc::new(ScriptedService::new(vec![text_response("Oh. You again.")]));
        let generator = generator(service);

        let reply = generator
            .craft_presence(&human("1", "bob", "hey snoid"))
            .await
            .unwrap();
        assert_eq!(reply, "Oh. You again.");
    }
}
