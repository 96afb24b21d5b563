//! `snoid doctor` — Diagnose configuration and connectivity.

use std::path::Path;

use snoid_channels::{DiscordChannel, DiscordConfig};
use snoid_config::{BotConfig, ConfigError};
use snoid_core::channel::Transport;
use snoid_core::provider::CompletionService;

pub async fn run(
    config_path: &Path,
    loaded: Result<BotConfig, ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Snoid Doctor — System Diagnostics");
    println!("===================================\n");

    let mut issues = 0;

    // Check config
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file at {}, using defaults", config_path.display());
    }

    let config = match loaded {
        Ok(config) => {
            println!("  ✅ Config valid");
            println!(
                "     gate: {}  critique: {}  history: {}",
                config.cheap_model, config.expensive_model, config.history_count
            );
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue found. Fix the config and run doctor again.");
            return Ok(());
        }
    };

    let pricing = super::pricing_table(&config);
    for model in [&config.cheap_model, &config.expensive_model] {
        if pricing.get(model).is_none() {
            println!("  ⚠️  No pricing for '{model}', its calls will be costed at $0");
            issues += 1;
        }
    }

    // Check OpenAI
    match super::completion_service(&config) {
        Ok(service) => match service.health_check().await {
            Ok(true) => println!("  ✅ OpenAI reachable at {}", config.openai_base_url),
            Ok(false) => {
                println!("  ❌ OpenAI health check failed (check the API key)");
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ OpenAI unreachable: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Check Discord
    match config.require_discord_token() {
        Ok(token) => {
            let discord = DiscordChannel::connect(
                DiscordConfig::new(token),
                super::request_timeout(&config),
            )
            .await;
            match discord {
                Ok(channel) => {
                    println!("  ✅ Discord token valid (bot id {})", channel.self_id());
                    match channel.health_check().await {
                        Ok(true) => println!("  ✅ Discord API reachable"),
                        Ok(false) => {
                            println!("  ❌ Discord API did not answer the identity check");
                            issues += 1;
                        }
                        Err(e) => {
                            println!("  ❌ Discord health check failed: {e}");
                            issues += 1;
                        }
                    }
                }
                Err(e) => {
                    println!("  ❌ Discord login failed: {e}");
                    issues += 1;
                }
            }
        }
        Err(e) => {
            println!("  ❌ {e}");
            issues += 1;
        }
    }

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
