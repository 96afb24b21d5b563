//! # Snoid Agent
//!
//! The triage pipeline: for each inbound chat message, pick an interaction
//! mode, decide whether it deserves a reply, and write one.
//!
//! - [`router`] — mode classification and the per-message state machine
//! - [`gate`] — cheap-tier yes/no screening
//! - [`critique`] — expensive-tier critique and greeting replies
//! - [`context`] — bounded transcript assembly
//! - [`commands`] — prefix commands run after bot handling

pub mod commands;
pub mod context;
pub mod critique;
pub mod gate;
pub mod metered;
pub mod prompts;
pub mod router;

#[cfg(any(test, feature = "test-util"))]
pub mod test_helpers;

pub use commands::PrefixCommands;
pub use context::{ContextAssembler, Transcript};
pub use critique::CritiqueGenerator;
pub use gate::DecisionGate;
pub use metered::MeteredClient;
pub use prompts::SENTINEL;
pub use router::{InteractionMode, MessageRouter, Outcome, serve};
