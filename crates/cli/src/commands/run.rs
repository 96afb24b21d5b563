//! `snoid run` — Connect to Discord and handle messages.

use std::sync::Arc;

use snoid_channels::{DiscordChannel, DiscordConfig};
use snoid_config::BotConfig;

pub async fn run(
    config: BotConfig,
    channels: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let token = config.require_discord_token()?;
    // Fail on a missing OpenAI key before opening the gateway.
    config.require_openai_key()?;

    let discord_config = DiscordConfig {
        channel_filter: channels,
        ..DiscordConfig::new(token)
    };
    let transport = DiscordChannel::connect(discord_config, super::request_timeout(&config))
        .await
        .map_err(|e| format!("Failed to connect to Discord: {e}"))?;

    super::serve_transport(&config, Arc::new(transport)).await
}
