//! Discord transport.
//!
//! Inbound messages arrive over the gateway websocket (see [`gateway`]);
//! history, replies and typing indicators go through the REST API.

mod gateway;
mod model;

use std::time::Duration;

use async_trait::async_trait;
use snoid_core::channel::Transport;
use snoid_core::error::ChannelError;
use snoid_core::message::{ChannelId, InboundMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use model::{ApiMessage, ApiUser};

/// GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT
pub const DEFAULT_INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 12) | (1 << 15);

/// Discord rejects message bodies longer than this many characters.
const MAX_MESSAGE_CHARS: usize = 2000;

/// Discord returns at most this many messages per history page.
const MAX_HISTORY_PAGE: usize = 100;

/// Discord transport configuration.
#[derive(Clone)]
pub struct DiscordConfig {
    /// Bot token from the Discord Developer Portal.
    pub bot_token: String,
    /// REST base URL.
    pub api_base: String,
    /// Gateway websocket URL.
    pub gateway_url: String,
    /// Gateway intents bitmask.
    pub intents: u64,
    /// Channel IDs to listen in. Empty = all channels.
    pub channel_filter: Vec<String>,
}

impl DiscordConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base: "https://discord.com/api/v10".into(),
            gateway_url: "wss://gateway.discord.gg/?v=10&encoding=json".into(),
            intents: DEFAULT_INTENTS,
            channel_filter: vec![],
        }
    }

    /// Whether messages from `channel_id` should be forwarded.
    pub fn listens_to(&self, channel_id: &str) -> bool {
        self.channel_filter.is_empty() || self.channel_filter.iter().any(|c| c == channel_id)
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("bot_token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("gateway_url", &self.gateway_url)
            .field("intents", &self.intents)
            .field("channel_filter", &self.channel_filter)
            .finish()
    }
}

/// Which REST call produced an error status.
#[derive(Debug, Clone, Copy)]
enum RestCall {
    History,
    Send,
    Typing,
}

fn status_error(call: RestCall, channel: &str, status: u16, body: String) -> ChannelError {
    match status {
        429 => {
            let retry_after_secs = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["retry_after"].as_f64())
                .map(|secs| secs.ceil() as u64)
                .unwrap_or(1);
            ChannelError::RateLimited {
                channel: channel.to_string(),
                retry_after_secs,
            }
        }
        401 => ChannelError::AuthenticationFailed("Discord rejected the bot token".into()),
        _ => {
            let reason = format!("HTTP {status}: {body}");
            match call {
                RestCall::History => ChannelError::HistoryUnavailable {
                    channel: channel.to_string(),
                    reason,
                },
                RestCall::Send | RestCall::Typing => ChannelError::DeliveryFailed {
                    channel: channel.to_string(),
                    reason,
                },
            }
        }
    }
}

/// Clip a reply to Discord's message length limit.
fn clip_for_discord(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Discord transport.
pub struct DiscordChannel {
    config: DiscordConfig,
    http: reqwest::Client,
    user_id: String,
    listener: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl DiscordChannel {
    /// Build the transport and resolve the bot's own user ID via `/users/@me`.
    pub async fn connect(config: DiscordConfig, timeout: Duration) -> Result<Self, ChannelError> {
        let mut channel = Self::with_identity(config, String::new(), timeout)?;
        let me = channel.current_user().await?;
        info!(user_id = %me.id, username = %me.username, "Discord identity resolved");
        channel.user_id = me.id;
        Ok(channel)
    }

    /// Build the transport with an already-known bot user ID.
    pub fn with_identity(
        config: DiscordConfig,
        user_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChannelError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self {
            config,
            http,
            user_id: user_id.into(),
            listener: tokio::sync::Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header("Authorization", format!("Bot {}", self.config.bot_token))
    }

    async fn current_user(&self) -> Result<ApiUser, ChannelError> {
        let response = self
            .authorized(self.http.get(self.url("/users/@me")))
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionLost(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(RestCall::Send, "@me", status, body));
        }

        response
            .json()
            .await
            .map_err(|e| ChannelError::InvalidPayload(e.to_string()))
    }
}

#[async_trait]
impl Transport for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    fn self_id(&self) -> &str {
        &self.user_id
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<InboundMessage, ChannelError>>, ChannelError> {
        info!("Discord gateway starting");
        let (tx, rx) = mpsc::channel(64);
        let handle = tokio::spawn(gateway::run(self.config.clone(), tx));
        if let Some(previous) = self.listener.lock().await.replace(handle) {
            previous.abort();
        }
        Ok(rx)
    }

    async fn fetch_history(
        &self,
        channel: &ChannelId,
        before: &str,
        limit: usize,
    ) -> Result<Vec<InboundMessage>, ChannelError> {
        if limit == 0 {
            return Ok(vec![]);
        }
        let limit = limit.min(MAX_HISTORY_PAGE);

        let response = self
            .authorized(self.http.get(self.url(&format!("/channels/{channel}/messages"))))
            .query(&[("before", before.to_string()), ("limit", limit.to_string())])
            .send()
            .await
            .map_err(|e| ChannelError::HistoryUnavailable {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(RestCall::History, channel.as_str(), status, body));
        }

        let messages: Vec<ApiMessage> =
            response
                .json()
                .await
                .map_err(|e| ChannelError::HistoryUnavailable {
                    channel: channel.to_string(),
                    reason: format!("unparseable history: {e}"),
                })?;

        debug!(channel = %channel, count = messages.len(), "Fetched Discord history");
        Ok(messages.into_iter().map(ApiMessage::into_inbound).collect())
    }

    async fn send_reply(&self, message: &InboundMessage, text: &str) -> Result<(), ChannelError> {
        let channel = &message.channel_id;
        let body = serde_json::json!({
            "content": clip_for_discord(text),
            "message_reference": {
                "message_id": message.id,
                "fail_if_not_exists": false,
            },
            "allowed_mentions": { "parse": [], "replied_user": false },
        });

        let response = self
            .authorized(self.http.post(self.url(&format!("/channels/{channel}/messages"))))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::DeliveryFailed {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            warn!(status, channel = %channel, "Discord rejected reply");
            return Err(status_error(RestCall::Send, channel.as_str(), status, body));
        }

        info!(
            channel = %channel,
            reply_to = %message.id,
            content_len = text.len(),
            "Discord reply sent"
        );
        Ok(())
    }

    async fn send_typing(&self, channel: &ChannelId) -> Result<(), ChannelError> {
        let response = self
            .authorized(self.http.post(self.url(&format!("/channels/{channel}/typing"))))
            .send()
            .await
            .map_err(|e| ChannelError::DeliveryFailed {
                channel: channel.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(RestCall::Typing, channel.as_str(), status, body));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        info!("Discord channel stopping");
        if let Some(handle) = self.listener.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        Ok(self.current_user().await.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> DiscordChannel {
        DiscordChannel::with_identity(
            DiscordConfig::new("test-discord-token"),
            "42",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn channel_name_and_identity() {
        let ch = channel();
        assert_eq!(ch.name(), "discord");
        assert_eq!(ch.self_id(), "42");
    }

    #[test]
    fn default_intents_include_message_content() {
        assert_eq!(DEFAULT_INTENTS, 37377);
        assert_ne!(DEFAULT_INTENTS & (1 << 15), 0);
    }

    #[test]
    fn channel_filter() {
        let open = DiscordConfig::new("t");
        assert!(open.listens_to("anything"));

        let filtered = DiscordConfig {
            channel_filter: vec!["900".into()],
            ..DiscordConfig::new("t")
        };
        assert!(filtered.listens_to("900"));
        assert!(!filtered.listens_to("901"));
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", DiscordConfig::new("super-secret"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn url_joins_base_and_path() {
        let mut config = DiscordConfig::new("t");
        config.api_base = "http://localhost:9999/api/".into();
        let ch = DiscordChannel::with_identity(config, "1", Duration::from_secs(1)).unwrap();
        assert_eq!(ch.url("/users/@me"), "http://localhost:9999/api/users/@me");
    }

    #[test]
    fn replies_are_clipped_to_discord_limit() {
        let long = "é".repeat(2500);
        assert_eq!(clip_for_discord(&long).chars().count(), 2000);
        assert_eq!(clip_for_discord("short"), "short");
    }

    #[test]
    fn status_errors_map_by_call() {
        assert!(matches!(
            status_error(RestCall::History, "9", 403, "Missing Access".into()),
            ChannelError::HistoryUnavailable { .. }
        ));
        assert!(matches!(
            status_error(RestCall::Send, "9", 500, String::new()),
            ChannelError::DeliveryFailed { .. }
        ));
        match status_error(RestCall::Typing, "9", 429, r#"{"retry_after": 1.2}"#.into()) {
            ChannelError::RateLimited { retry_after_secs, .. } => assert_eq!(retry_after_secs, 2),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            status_error(RestCall::Send, "9", 401, String::new()),
            ChannelError::AuthenticationFailed(_)
        ));
    }

    #[tokio::test]
    async fn zero_history_skips_network() {
        let ch = channel();
        let history = ch
            .fetch_history(&ChannelId::from("900"), "1100", 0)
            .await
            .unwrap();
        assert!(history.is_empty());
    }
}
