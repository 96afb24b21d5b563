//! Completion client — normalizes raw service responses.
//!
//! Whatever shape the service returns, callers get `(text, input_tokens,
//! output_tokens)`. Missing text and missing usage are not errors: they
//! collapse to an empty string and zero counts.

use std::sync::Arc;

use snoid_core::error::ProviderError;
use snoid_core::provider::{CompletionRequest, CompletionResponse, CompletionService};
use tracing::debug;

/// Normalized result of one completion call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionResult {
    /// Trimmed output text, possibly empty.
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl CompletionResult {
    /// Normalize a raw response.
    ///
    /// Prefers the convenience `output_text`; when it is absent or blank,
    /// concatenates the text fragments of the structured output.
    pub fn from_response(response: &CompletionResponse) -> Self {
        let text = response
            .output_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| collect_fragments(response));

        let usage = response.usage.unwrap_or_default();

        Self {
            text: text.trim().to_string(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
        }
    }
}

fn collect_fragments(response: &CompletionResponse) -> String {
    response
        .output
        .iter()
        .flat_map(|item| item.content.iter())
        .filter_map(|part| part.text.as_deref())
        .collect()
}

/// Cloneable handle over a shared completion service.
#[derive(Clone)]
pub struct CompletionClient {
    service: Arc<dyn CompletionService>,
}

impl CompletionClient {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    /// Run `prompt` against `model` and normalize the response.
    pub async fn complete(
        &self,
        model: &str,
        prompt: &str,
    ) -> std::result::Result<CompletionResult, ProviderError> {
        let response = self
            .service
            .create(CompletionRequest::new(model, prompt))
            .await?;
        let result = CompletionResult::from_response(&response);

        debug!(
            provider = %self.service.name(),
            model = %model,
            text_len = result.text.len(),
            input_tokens = result.input_tokens,
            output_tokens = result.output_tokens,
            "Completion received"
        );

        Ok(result)
    }
}
