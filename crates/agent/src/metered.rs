//! Completion calls that log their own cost.

use std::sync::Arc;

use snoid_core::error::ProviderError;
use snoid_providers::{CompletionClient, CompletionResult};
use snoid_telemetry::{CallPurpose, CostRecord, PricingTable};

/// A [`CompletionClient`] paired with the pricing table used to cost it.
#[derive(Clone)]
pub struct MeteredClient {
    client: CompletionClient,
    pricing: Arc<PricingTable>,
}

impl MeteredClient {
    pub fn new(client: CompletionClient, pricing: Arc<PricingTable>) -> Self {
        Self { client, pricing }
    }

    /// Complete `prompt` on `model` and log a [`CostRecord`] for the call.
    pub async fn call(
        &self,
        purpose: CallPurpose,
        model: &str,
        prompt: &str,
        message_id: &str,
    ) -> Result<CompletionResult, ProviderError> {
        let result = self.client.complete(model, prompt).await?;
        CostRecord::new(
            &self.pricing,
            purpose,
            model,
            result.input_tokens,
            result.output_tokens,
        )
        .log(message_id);
        Ok(result)
    }
}
