//! Subcommand implementations and the wiring they share.

pub mod chat;
pub mod doctor;
pub mod price;
pub mod run;

use std::sync::Arc;
use std::time::Duration;

use snoid_agent::{MessageRouter, PrefixCommands, serve};
use snoid_config::BotConfig;
use snoid_core::channel::Transport;
use snoid_providers::OpenAiResponsesService;
use snoid_telemetry::{ModelPricing, PricingTable};

/// Built-in rates with any `[pricing]` overrides from config layered on top.
pub fn pricing_table(config: &BotConfig) -> PricingTable {
    PricingTable::with_defaults().with_overrides(config.pricing.iter().map(|(model, price)| {
        (
            model.as_str(),
            ModelPricing::new(price.input_per_1k, price.output_per_1k),
        )
    }))
}

/// The OpenAI service configured from `config`. Fails without an API key.
pub fn completion_service(
    config: &BotConfig,
) -> Result<OpenAiResponsesService, Box<dyn std::error::Error>> {
    let key = config.require_openai_key()?;
    let service = OpenAiResponsesService::new(
        "openai",
        config.openai_base_url.as_str(),
        key,
        request_timeout(config),
    )?;
    Ok(service)
}

pub fn request_timeout(config: &BotConfig) -> Duration {
    Duration::from_secs(config.request_timeout_secs)
}

/// Wire `transport` to a router and handle messages until it stops.
pub async fn serve_transport(
    config: &BotConfig,
    transport: Arc<dyn Transport>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = Arc::new(completion_service(config)?);
    let pricing = Arc::new(pricing_table(config));
    let commands = Arc::new(PrefixCommands::new(
        config.command_prefix.as_str(),
        pricing.clone(),
    ));
    let router = Arc::new(
        MessageRouter::new(config, transport.clone(), service, pricing).with_dispatcher(commands),
    );

    let inbound = transport
        .start()
        .await
        .map_err(|e| format!("Failed to start {} transport: {e}", transport.name()))?;

    tracing::info!(
        transport = transport.name(),
        cheap_model = %config.cheap_model,
        expensive_model = %config.expensive_model,
        history_count = config.history_count,
        "Snoid is listening"
    );

    tokio::select! {
        _ = serve(router, inbound) => {
            tracing::info!("Transport closed");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
    }

    transport.stop().await?;
    Ok(())
}
