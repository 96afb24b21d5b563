//! End-to-end: a local chat session routed through the full pipeline.
//!
//! Lines are ingested through the terminal transport exactly as `snoid chat`
//! does, then handed to a router backed by a scripted completion service.

use std::sync::Arc;

use snoid_agent::test_helpers::ScriptedService;
use snoid_agent::{InteractionMode, MessageRouter, Outcome, PrefixCommands};
use snoid_channels::CliChannel;
use snoid_config::BotConfig;
use snoid_core::channel::Transport;
use snoid_telemetry::PricingTable;

fn session(service: Arc<ScriptedService>) -> (Arc<CliChannel>, MessageRouter) {
    let config = BotConfig::default();
    let pricing = Arc::new(PricingTable::with_defaults());
    let channel = Arc::new(CliChannel::new("snoid", "you"));
    let router = MessageRouter::new(&config, channel.clone(), service, pricing.clone())
        .with_dispatcher(Arc::new(PrefixCommands::new("!", pricing)));
    (channel, router)
}

fn scripted(texts: &[&str]) -> Arc<ScriptedService> {
    Arc::new(ScriptedService::texts(texts))
}

// ── E2E ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_critique_sees_earlier_lines_and_reply_joins_history() {
    let service = scripted(&["yes", "Wrong. It was 1969.", "no"]);
    let (channel, router) = session(service.clone());

    // Unaddressed lines go through the gate.
    let first = channel.ingest("the moon landing was in 1972");
    let outcome = router.handle(&first).await;
    assert_eq!(
        outcome,
        Outcome::Replied {
            mode: InteractionMode::Passive,
            text: "Wrong. It was 1969.".into()
        }
    );

    let second = channel.ingest("fine, whatever");
    router.handle(&second).await;

    // The second gate call saw the first line and the bot's reply.
    let requests = service.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests[2].prompt.ends_with(concat!(
        "Transcript:\n",
        "you: the moon landing was in 1972\n",
        "snoid: Wrong. It was 1969.\n",
        "you: fine, whatever"
    )));
}

#[tokio::test]
async fn e2e_at_mention_is_direct_address() {
    let service = scripted(&["Pineapple on pizza is a war crime."]);
    let (channel, router) = session(service.clone());

    let message = channel.ingest("@snoid pineapple belongs on pizza");
    assert!(message.mentions_user(channel.self_id()));

    let outcome = router.handle(&message).await;
    assert!(matches!(
        outcome,
        Outcome::Replied {
            mode: InteractionMode::DirectAddress,
            ..
        }
    ));
    assert_eq!(service.requests()[0].model, "gpt-4o");
}

#[tokio::test]
async fn e2e_ping_command() {
    let service = scripted(&["no"]);
    let (channel, router) = session(service);

    let ping = channel.ingest("!ping");
    router.handle(&ping).await;

    let after = channel.ingest("next");
    let history = channel
        .fetch_history(&after.channel_id, &after.id, 5)
        .await
        .unwrap();
    assert_eq!(history[0].content, "pong");
    assert!(history[0].is_bot);
}
