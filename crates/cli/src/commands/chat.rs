//! `snoid chat` — Talk to the bot in the terminal.
//!
//! The terminal is one channel. Every line goes through the same router as
//! Discord traffic; start a line with `@<bot name>` to address the bot.

use std::sync::Arc;

use snoid_channels::CliChannel;
use snoid_config::BotConfig;

pub async fn run(config: BotConfig, user: String) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("  Snoid — local chat");
    println!();
    println!("  Gate model:     {}", config.cheap_model);
    println!("  Critique model: {}", config.expensive_model);
    println!("  History:        {} messages", config.history_count);
    println!();
    println!("  Say something. Start with @{} to address the bot.", config.bot_name);
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let transport = Arc::new(CliChannel::new(config.bot_name.as_str(), user));
    super::serve_transport(&config, transport).await?;

    println!();
    Ok(())
}
