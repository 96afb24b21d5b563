//! Chat transport implementations for Snoid.
//!
//! Each transport connects to a chat platform and relays messages to and
//! from the message router.
//!
//! Available transports:
//! - **Discord** — gateway websocket for inbound events, REST for history,
//!   replies and typing
//! - **CLI** — a local terminal session on stdin/stdout

pub mod cli;
pub mod discord;

pub use cli::CliChannel;
pub use discord::{DiscordChannel, DiscordConfig};
