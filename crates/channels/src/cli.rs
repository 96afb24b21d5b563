//! CLI transport — a single local "channel" on stdin/stdout.
//!
//! Every line typed becomes an inbound message; bot replies are printed and
//! kept in the same in-memory log so history fetches see the whole
//! conversation. Start a line with `@<bot name>` to address the bot directly.
//! Used for `snoid chat`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use snoid_core::channel::Transport;
use snoid_core::error::ChannelError;
use snoid_core::message::{ChannelId, InboundMessage};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const CLI_CHANNEL: &str = "cli";
const CLI_BOT_ID: &str = "cli-bot";

/// Shared conversation log for the local session.
#[derive(Default)]
struct SessionLog {
    messages: Mutex<Vec<InboundMessage>>,
    next_id: AtomicU64,
}

impl SessionLog {
    fn record(&self, author_name: &str, content: &str, is_bot: bool) -> InboundMessage {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let message = InboundMessage {
            id: id.to_string(),
            author_id: if is_bot { CLI_BOT_ID.into() } else { "local_user".into() },
            author_name: author_name.to_string(),
            channel_id: ChannelId::from(CLI_CHANNEL),
            content: content.to_string(),
            is_bot,
            mentions: Default::default(),
            timestamp: Utc::now(),
        };
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.clone());
        }
        message
    }

    /// Messages before `before`, newest first.
    fn before(&self, before: &str, limit: usize) -> Vec<InboundMessage> {
        let Ok(messages) = self.messages.lock() else {
            return vec![];
        };
        let end = messages
            .iter()
            .position(|m| m.id == before)
            .unwrap_or(messages.len());
        messages[..end].iter().rev().take(limit).cloned().collect()
    }
}

/// Interactive CLI transport for terminal-based chat.
pub struct CliChannel {
    bot_name: String,
    user_name: String,
    log: Arc<SessionLog>,
}

impl CliChannel {
    pub fn new(bot_name: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            bot_name: bot_name.into(),
            user_name: user_name.into(),
            log: Arc::new(SessionLog::default()),
        }
    }

    /// Record a typed line as an inbound message.
    ///
    /// A leading `@<bot name>` becomes an explicit mention of the bot.
    pub fn ingest(&self, line: &str) -> InboundMessage {
        ingest_line(&self.log, &self.user_name, &self.bot_name, line)
    }
}

fn ingest_line(log: &SessionLog, user_name: &str, bot_name: &str, line: &str) -> InboundMessage {
    let mut message = log.record(user_name, line, false);
    if addresses_bot(line, bot_name) {
        message.mentions.insert(CLI_BOT_ID.into());
    }
    message
}

fn addresses_bot(line: &str, bot_name: &str) -> bool {
    let mention = format!("@{}", bot_name.to_lowercase());
    line.trim_start().to_lowercase().starts_with(&mention)
}

#[async_trait]
impl Transport for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn self_id(&self) -> &str {
        CLI_BOT_ID
    }

    async fn start(
        &self,
    ) -> Result<mpsc::Receiver<Result<InboundMessage, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let log = self.log.clone();
        let user_name = self.user_name.clone();
        let bot_name = self.bot_name.clone();

        tokio::spawn(async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }

                        // Check for exit commands
                        if matches!(line.as_str(), "exit" | "quit" | "/exit" | "/quit" | ":q") {
                            break;
                        }

                        let msg = ingest_line(&log, &user_name, &bot_name, &line);
                        if tx.send(Ok(msg)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx
                            .send(Err(ChannelError::ConnectionLost(e.to_string())))
                            .await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn fetch_history(
        &self,
        _channel: &ChannelId,
        before: &str,
        limit: usize,
    ) -> Result<Vec<InboundMessage>, ChannelError> {
        Ok(self.log.before(before, limit))
    }

    async fn send_reply(&self, _message: &InboundMessage, text: &str) -> Result<(), ChannelError> {
        self.log.record(&self.bot_name, text, true);
        println!("{}: {text}", self.bot_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_channel_properties() {
        let ch = CliChannel::new("snoid", "you");
        assert_eq!(ch.name(), "cli");
        assert_eq!(ch.self_id(), "cli-bot");
    }

    #[test]
    fn at_mention_addresses_bot() {
        let ch = CliChannel::new("Snoid", "you");
        assert!(ch.ingest("@snoid is the moon cheese?").mentions_user("cli-bot"));
        assert!(!ch.ingest("hey snoid").mentions_user("cli-bot"));
    }

    #[tokio::test]
    async fn history_is_newest_first_and_excludes_target() {
        let ch = CliChannel::new("snoid", "you");
        ch.ingest("one");
        ch.ingest("two");
        let three = ch.ingest("three");
        ch.send_reply(&three, "wrong").await.unwrap();
        let four = ch.ingest("four");

        let history = ch
            .fetch_history(&four.channel_id, &four.id, 10)
            .await
            .unwrap();
        let texts: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["wrong", "three", "two", "one"]);
        assert!(history[0].is_bot);

        let limited = ch.fetch_history(&four.channel_id, &four.id, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }
}
