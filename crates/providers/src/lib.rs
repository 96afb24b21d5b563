//! Completion service implementations for Snoid.
//!
//! - **openai** — OpenAI Responses API over HTTPS
//! - **client** — the normalizing [`CompletionClient`] used by the triage
//!   pipeline, independent of which service sits behind it

pub mod client;
pub mod openai;

pub use client::{CompletionClient, CompletionResult};
pub use openai::OpenAiResponsesService;
