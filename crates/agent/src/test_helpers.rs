//! Scripted collaborators for pipeline tests.
//!
//! Compiled for this crate's own tests and, behind the `test-util` feature,
//! for integration tests here and in downstream crates.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use snoid_core::channel::Transport;
use snoid_core::command::CommandDispatcher;
use snoid_core::error::{ChannelError, ProviderError};
use snoid_core::message::{ChannelId, InboundMessage};
use snoid_core::provider::{
    CompletionRequest, CompletionResponse, CompletionService, ContentPart, OutputItem, TokenUsage,
};
use snoid_providers::CompletionClient;
use snoid_telemetry::PricingTable;
use tokio::sync::mpsc;

use crate::metered::MeteredClient;

/// A completion service that replays scripted results in order.
///
/// Panics if more calls are made than results provided.
pub struct ScriptedService {
    results: Mutex<Vec<Result<CompletionResponse, ProviderError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedService {
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self::from_results(responses.into_iter().map(Ok).collect())
    }

    pub fn from_results(results: Vec<Result<CompletionResponse, ProviderError>>) -> Self {
        Self {
            results: Mutex::new(results),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// One [`text_response`] per entry.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| text_response(t)).collect())
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Model of every request so far, in call order.
    pub fn models(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.model).collect()
    }
}

#[async_trait::async_trait]
impl CompletionService for ScriptedService {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn create(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            panic!("ScriptedService: no more responses (call #{call})");
        }
        results.remove(0)
    }
}

/// Response carrying `text` as structured output, with usage.
pub fn text_response(text: &str) -> CompletionResponse {
    CompletionResponse {
        output_text: None,
        output: vec![OutputItem {
            kind: Some("message".into()),
            content: vec![ContentPart::text(text)],
        }],
        usage: Some(TokenUsage {
            input_tokens: 120,
            output_tokens: 12,
            total_tokens: 132,
        }),
        model: None,
    }
}

/// No text anywhere and no usage.
pub fn empty_response() -> CompletionResponse {
    CompletionResponse::default()
}

/// A message item whose only text part is missing.
pub fn hollow_response() -> CompletionResponse {
    CompletionResponse {
        output_text: None,
        output: vec![OutputItem {
            kind: Some("message".into()),
            content: vec![ContentPart {
                kind: Some("output_text".into()),
                text: None,
            }],
        }],
        usage: None,
        model: None,
    }
}

pub fn metered(service: Arc<ScriptedService>) -> MeteredClient {
    MeteredClient::new(
        CompletionClient::new(service),
        Arc::new(PricingTable::with_defaults()),
    )
}

/// Human message in channel `c`.
pub fn human(id: &str, author: &str, content: &str) -> InboundMessage {
    InboundMessage::new(id, ChannelId::from("c"), author, content)
}

/// A transport that serves canned history and records what it is asked.
///
/// Its own user ID is [`RecordingTransport::SELF_ID`].
#[derive(Default)]
pub struct RecordingTransport {
    /// Newest first.
    history: Vec<InboundMessage>,
    fail_history: bool,
    fail_send: bool,
    respect_limit: bool,
    history_requests: Mutex<Vec<(String, usize)>>,
    typing_calls: AtomicUsize,
    sent: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub const SELF_ID: &'static str = "bot-1";

    pub fn with_history(history: Vec<InboundMessage>) -> Self {
        Self {
            history,
            respect_limit: true,
            ..Self::default()
        }
    }

    pub fn failing_history() -> Self {
        Self {
            fail_history: true,
            ..Self::default()
        }
    }

    /// Every reply fails with a delivery error.
    pub fn failing_send() -> Self {
        Self {
            fail_send: true,
            ..Self::default()
        }
    }

    /// Return the whole history regardless of the requested limit.
    pub fn ignoring_limit(mut self) -> Self {
        self.respect_limit = false;
        self
    }

    /// `(before, limit)` of every history fetch.
    pub fn history_requests(&self) -> Vec<(String, usize)> {
        self.history_requests.lock().unwrap().clone()
    }

    /// Replies delivered so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn typing_count(&self) -> usize {
        self.typing_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    fn self_id(&self) -> &str {
        Self::SELF_ID
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<InboundMessage, ChannelError>>, ChannelError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn fetch_history(
        &self,
        channel: &ChannelId,
        before: &str,
        limit: usize,
    ) -> Result<Vec<InboundMessage>, ChannelError> {
        self.history_requests
            .lock()
            .unwrap()
            .push((before.to_string(), limit));
        if self.fail_history {
            return Err(ChannelError::HistoryUnavailable {
                channel: channel.to_string(),
                reason: "missing permission".into(),
            });
        }
        let take = if self.respect_limit { limit } else { usize::MAX };
        Ok(self.history.iter().take(take).cloned().collect())
    }

    async fn send_reply(&self, message: &InboundMessage, text: &str) -> Result<(), ChannelError> {
        if self.fail_send {
            return Err(ChannelError::DeliveryFailed {
                channel: message.channel_id.to_string(),
                reason: "missing access".into(),
            });
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_typing(&self, _channel: &ChannelId) -> Result<(), ChannelError> {
        self.typing_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A dispatcher that records which messages reached it and never replies.
#[derive(Default)]
pub struct RecordingDispatcher {
    seen: Mutex<Vec<String>>,
}

impl RecordingDispatcher {
    /// IDs of dispatched messages, in arrival order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CommandDispatcher for RecordingDispatcher {
    async fn dispatch(&self, message: &InboundMessage) -> Option<String> {
        self.seen.lock().unwrap().push(message.id.clone());
        None
    }
}
