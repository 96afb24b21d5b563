//! Decision gate: should a passive message get a critique at all?
//!
//! One cheap-tier call per message. The answer is affirmative only when it
//! starts with `y` after trimming and lowercasing; anything else, including
//! an empty answer, is a no.

use snoid_core::error::ProviderError;
use snoid_core::message::InboundMessage;
use snoid_telemetry::CallPurpose;
use tracing::debug;

use crate::context::ContextAssembler;
use crate::metered::MeteredClient;
use crate::prompts;

/// Interpret a gate answer.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().to_lowercase().starts_with('y')
}

pub struct DecisionGate {
    assembler: ContextAssembler,
    client: MeteredClient,
    /// Cheap-tier model identifier.
    model: String,
    history_count: usize,
}

impl DecisionGate {
    pub fn new(
        assembler: ContextAssembler,
        client: MeteredClient,
        model: impl Into<String>,
        history_count: usize,
    ) -> Self {
        Self {
            assembler,
            client,
            model: model.into(),
            history_count,
        }
    }

    /// Ask the cheap model whether the final line of the transcript is wrong.
    pub async fn should_critique(&self, message: &InboundMessage) -> Result<bool, ProviderError> {
        let transcript = self
            .assembler
            .build_context(message, self.history_count)
            .await;
        self.should_critique_transcript(message, &transcript).await
    }

    /// Same as [`should_critique`](Self::should_critique) over an already
    /// assembled transcript.
    pub async fn should_critique_transcript(
        &self,
        message: &InboundMessage,
        transcript: &str,
    ) -> Result<bool, ProviderError> {
        let result = self
            .client
            .call(
                CallPurpose::Gate,
                &self.model,
                &prompts::gate_prompt(transcript),
                &message.id,
            )
            .await?;

        let verdict = is_affirmative(&result.text);
        debug!(
            message_id = %message.id,
            answer = %result.text,
            verdict,
            "Decision gate answered"
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::test_helpers::{RecordingTransport, ScriptedService, human, metered, text_response};

    fn gate(service: Arc<ScriptedService>, history_count: usize) -> DecisionGate {
        let assembler = ContextAssembler::new(Arc::new(RecordingTransport::default()));
        DecisionGate::new(assembler, metered(service), "gpt-4o-mini", history_count)
    }

    #[test]
    fn affirmative_answers() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("  Yes, it is wrong."));
        assert!(is_affirmative("Y"));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("   "));
        assert!(!is_affirmative("maybe yes"));
    }

    #[tokio::test]
    async fn gate_uses_cheap_model_and_final_line() {
        let service = Arc::new(ScriptedService::new(vec![text_response("yes")]));
        let gate = gate(service.clone(), 0);

        let verdict = gate.should_critique(&human("1", "alice", "2+2=5")).await.unwrap();
        assert!(verdict);

        let requests = service.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert!(requests[0].prompt.ends_with("Transcript:\nalice: 2+2=5"));
    }

    #[tokio::test]
    async fn negative_and_empty_answers_decline() {
        let service = Arc::new(ScriptedService::new(vec![
            text_response("No."),
            text_response(""),
        ]));
        let gate = gate(service, 0);
        let msg = human("1", "alice", "water is wet");

        assert!(!gate.should_critique(&msg).await.unwrap());
        assert!(!gate.should_critique(&msg).await.unwrap());
    }

    #[tokio::test]
    async fn given_transcript_is_used_as_is() {
        let service = Arc::new(ScriptedService::texts(&["yes"]));
        let transport = Arc::new(RecordingTransport::with_history(vec![human("0", "bob", "hi")]));
        let gate = DecisionGate::new(
            ContextAssembler::new(transport.clone()),
            metered(service.clone()),
            "gpt-4o-mini",
            9,
        );

        let verdict = gate
            .should_critique_transcript(&human("1", "alice", "2+2=5"), "bob: hi\nalice: 2+2=5")
            .await
            .unwrap();
        assert!(verdict);
        assert!(transport.history_requests().is_empty());
        assert!(service.requests()[0].prompt.ends_with("Transcript:\nbob: hi\nalice: 2+2=5"));
    }

    #[tokio::test]
    async fn service_errors_propagate() {
        let service = Arc::new(ScriptedService::from_results(vec![Err(
            ProviderError::Timeout("slow".into()),
        )]));
        let gate = gate(service, 0);

        let err = gate.should_critique(&human("1", "alice", "x")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }
}
