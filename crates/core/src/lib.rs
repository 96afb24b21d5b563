//! # Snoid Core
//!
//! Domain types, traits, and error definitions for the Snoid chat bot.
//! This crate has **no I/O of its own** — it defines the domain model that
//! the transport, completion-service and triage crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here:
//! - [`Transport`] — the chat platform (Discord, local terminal)
//! - [`CompletionService`] — the language-model backend
//! - [`CommandDispatcher`] — downstream command handling
//!
//! Implementations live in their respective crates, which keeps the triage
//! pipeline testable with scripted mocks.

pub mod channel;
pub mod command;
pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use channel::Transport;
pub use command::{CommandDispatcher, NoCommands};
pub use error::{ChannelError, Error, ProviderError};
pub use message::{ChannelId, InboundMessage};
pub use provider::{
    CompletionRequest, CompletionResponse, CompletionService, ContentPart, OutputItem, TokenUsage,
};
