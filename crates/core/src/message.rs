//! Inbound message domain types.
//!
//! One [`InboundMessage`] is produced per platform event. It is never
//! mutated after it is received and is dropped once handling completes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform identifier of a chat channel (Discord channel snowflake, `cli`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message observed on a channel.
///
/// Used both for the message being handled and for the history entries the
/// transport returns when assembling context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform message ID
    pub id: String,

    /// Platform user ID of the author
    pub author_id: String,

    /// Human-readable author name (nickname, display name or username)
    pub author_name: String,

    /// The channel the message was posted in
    pub channel_id: ChannelId,

    /// Raw text content
    pub content: String,

    /// Whether the author is an automated account
    #[serde(default)]
    pub is_bot: bool,

    /// User IDs explicitly mentioned in the message
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub mentions: BTreeSet<String>,

    /// When the platform received the message
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a human-authored message with no mentions.
    pub fn new(
        id: impl Into<String>,
        channel_id: ChannelId,
        author_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let author_name = author_name.into();
        Self {
            id: id.into(),
            author_id: author_name.to_lowercase(),
            author_name,
            channel_id,
            content: content.into(),
            is_bot: false,
            mentions: BTreeSet::new(),
            timestamp: Utc::now(),
        }
    }

    /// Add a mentioned user ID.
    pub fn mentioning(mut self, user_id: impl Into<String>) -> Self {
        self.mentions.insert(user_id.into());
        self
    }

    /// Mark the message as authored by an automated account.
    pub fn from_bot(mut self) -> Self {
        self.is_bot = true;
        self
    }

    /// Whether the given user ID is explicitly mentioned.
    pub fn mentions_user(&self, user_id: &str) -> bool {
        !user_id.is_empty() && self.mentions.contains(user_id)
    }
}
