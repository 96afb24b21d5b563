//! Discord API payload types (internal).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use snoid_core::message::{ChannelId, InboundMessage};

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiMember {
    #[serde(default)]
    pub nick: Option<String>,
}

/// A message as returned by REST history and `MESSAGE_CREATE` dispatches.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    pub author: ApiUser,
    #[serde(default)]
    pub mentions: Vec<ApiUser>,
    #[serde(default)]
    pub member: Option<ApiMember>,
    pub timestamp: DateTime<Utc>,
}

impl ApiMessage {
    /// Guild nickname, then global display name, then username.
    fn display_name(&self) -> String {
        self.member
            .as_ref()
            .and_then(|m| m.nick.clone())
            .or_else(|| self.author.global_name.clone())
            .unwrap_or_else(|| self.author.username.clone())
    }

    pub fn into_inbound(self) -> InboundMessage {
        let author_name = self.display_name();
        InboundMessage {
            id: self.id,
            author_id: self.author.id,
            author_name,
            channel_id: ChannelId(self.channel_id),
            content: self.content,
            is_bot: self.author.bot,
            mentions: self.mentions.into_iter().map(|u| u.id).collect(),
            timestamp: self.timestamp,
        }
    }
}

/// A gateway frame: `{op, d, s, t}`.
#[derive(Debug, Deserialize)]
pub(crate) struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: serde_json::Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = r#"{
        "id": "1100",
        "channel_id": "900",
        "content": "<@42> pineapple belongs on pizza",
        "author": {"id": "7", "username": "alice", "global_name": "Alice A."},
        "mentions": [{"id": "42", "username": "snoid", "bot": true}],
        "member": {"nick": "Ally"},
        "timestamp": "2024-05-01T12:00:00.000000+00:00"
    }"#;

    #[test]
    fn message_converts_with_nickname_and_mentions() {
        let api: ApiMessage = serde_json::from_str(MESSAGE).unwrap();
        let msg = api.into_inbound();
        assert_eq!(msg.id, "1100");
        assert_eq!(msg.channel_id.as_str(), "900");
        assert_eq!(msg.author_name, "Ally");
        assert!(!msg.is_bot);
        assert!(msg.mentions_user("42"));
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let api: ApiMessage = serde_json::from_str(
            r#"{"id":"1","channel_id":"2","author":{"id":"3","username":"bob","bot":true},
                "timestamp":"2024-05-01T12:00:00+00:00"}"#,
        )
        .unwrap();
        let msg = api.into_inbound();
        assert_eq!(msg.author_name, "bob");
        assert!(msg.is_bot);
        assert_eq!(msg.content, "");
        assert!(msg.mentions.is_empty());
    }
}
