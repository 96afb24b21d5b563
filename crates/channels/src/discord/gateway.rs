//! Discord gateway listener.
//!
//! Keeps one websocket session open, heartbeats at the interval the gateway
//! asks for, and forwards `MESSAGE_CREATE` dispatches as inbound messages.
//! Dropped sessions are re-established with exponential backoff; close
//! codes that cannot succeed on retry (bad token, bad intents) end the loop.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use snoid_core::error::ChannelError;
use snoid_core::message::InboundMessage;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, trace, warn};

use super::DiscordConfig;
use super::model::{ApiMessage, GatewayPayload};

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

type Inbound = mpsc::Sender<Result<InboundMessage, ChannelError>>;

/// How a gateway session ended.
#[derive(Debug)]
enum SessionEnd {
    /// The gateway asked us to reconnect, or the socket closed cleanly.
    Reconnect,
    /// Nobody is listening any more.
    ReceiverDropped,
    /// Retrying cannot help.
    Fatal(ChannelError),
}

/// Run sessions until the receiver goes away or a fatal close arrives.
pub(crate) async fn run(config: DiscordConfig, tx: Inbound) {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match session(&config, &tx).await {
            Ok(SessionEnd::ReceiverDropped) => {
                debug!("Discord gateway receiver dropped, stopping");
                return;
            }
            Ok(SessionEnd::Fatal(err)) => {
                warn!(error = %err, "Discord gateway closed permanently");
                let _ = tx.send(Err(err)).await;
                return;
            }
            Ok(SessionEnd::Reconnect) => {
                info!("Discord gateway session ended, reconnecting");
                backoff = INITIAL_BACKOFF;
            }
            Err(err) => {
                warn!(
                    error = %err,
                    backoff_secs = backoff.as_secs(),
                    "Discord gateway session failed"
                );
                if tx.send(Err(err)).await.is_err() {
                    return;
                }
            }
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn session(config: &DiscordConfig, tx: &Inbound) -> Result<SessionEnd, ChannelError> {
    let (socket, _) = connect_async(config.gateway_url.as_str())
        .await
        .map_err(|e| ChannelError::ConnectionLost(format!("gateway connect: {e}")))?;
    let (mut write, mut read) = socket.split();

    let interval = loop {
        match read.next().await {
            Some(Ok(WsMessage::Text(text))) => {
                let payload: GatewayPayload = serde_json::from_str(&text)
                    .map_err(|e| ChannelError::InvalidPayload(e.to_string()))?;
                if payload.op == OP_HELLO {
                    break heartbeat_interval(&payload)?;
                }
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(ChannelError::ConnectionLost(e.to_string())),
            None => return Ok(SessionEnd::Reconnect),
        }
    };

    write
        .send(WsMessage::Text(
            identify_frame(&config.bot_token, config.intents).to_string(),
        ))
        .await
        .map_err(|e| ChannelError::ConnectionLost(e.to_string()))?;

    let mut heartbeat = tokio::time::interval(interval);
    heartbeat.tick().await;
    let mut sequence: Option<u64> = None;
    let mut awaiting_ack = false;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if awaiting_ack {
                    warn!("Discord heartbeat not acknowledged, dropping zombie session");
                    return Ok(SessionEnd::Reconnect);
                }
                write
                    .send(WsMessage::Text(heartbeat_frame(sequence).to_string()))
                    .await
                    .map_err(|e| ChannelError::ConnectionLost(e.to_string()))?;
                awaiting_ack = true;
            }
            frame = read.next() => {
                let text = match frame {
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(close))) => {
                        let code = close.map(|c| u16::from(c.code));
                        return Ok(match code {
                            Some(code) if is_fatal_close(code) => SessionEnd::Fatal(
                                ChannelError::AuthenticationFailed(format!(
                                    "gateway closed with code {code}"
                                )),
                            ),
                            _ => SessionEnd::Reconnect,
                        });
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(ChannelError::ConnectionLost(e.to_string())),
                    None => return Ok(SessionEnd::Reconnect),
                };

                let payload: GatewayPayload = match serde_json::from_str(&text) {
                    Ok(p) => p,
                    Err(e) => {
                        trace!(error = %e, "Ignoring unparseable gateway frame");
                        continue;
                    }
                };
                if payload.s.is_some() {
                    sequence = payload.s;
                }

                match payload.op {
                    OP_DISPATCH => {
                        let Some(message) = decode_dispatch(payload) else {
                            continue;
                        };
                        if !config.listens_to(message.channel_id.as_str()) {
                            continue;
                        }
                        if tx.send(Ok(message)).await.is_err() {
                            return Ok(SessionEnd::ReceiverDropped);
                        }
                    }
                    OP_HEARTBEAT => {
                        write
                            .send(WsMessage::Text(heartbeat_frame(sequence).to_string()))
                            .await
                            .map_err(|e| ChannelError::ConnectionLost(e.to_string()))?;
                    }
                    OP_HEARTBEAT_ACK => awaiting_ack = false,
                    OP_RECONNECT | OP_INVALID_SESSION => return Ok(SessionEnd::Reconnect),
                    other => trace!(op = other, "Unhandled gateway opcode"),
                }
            }
        }
    }
}

fn heartbeat_interval(hello: &GatewayPayload) -> Result<Duration, ChannelError> {
    hello.d["heartbeat_interval"]
        .as_u64()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .ok_or_else(|| ChannelError::InvalidPayload("HELLO without heartbeat_interval".into()))
}

fn identify_frame(token: &str, intents: u64) -> serde_json::Value {
    serde_json::json!({
        "op": OP_IDENTIFY,
        "d": {
            "token": token,
            "intents": intents,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "snoid",
                "device": "snoid",
            },
        },
    })
}

fn heartbeat_frame(sequence: Option<u64>) -> serde_json::Value {
    serde_json::json!({ "op": OP_HEARTBEAT, "d": sequence })
}

/// Turn a dispatch frame into an inbound message, if it is one.
fn decode_dispatch(payload: GatewayPayload) -> Option<InboundMessage> {
    match payload.t.as_deref() {
        Some("MESSAGE_CREATE") => match serde_json::from_value::<ApiMessage>(payload.d) {
            Ok(api) => Some(api.into_inbound()),
            Err(e) => {
                warn!(error = %e, "Malformed MESSAGE_CREATE payload");
                None
            }
        },
        Some("READY") => {
            info!(
                user = payload.d["user"]["username"].as_str().unwrap_or("?"),
                "Discord gateway ready"
            );
            None
        }
        _ => None,
    }
}

/// Close codes for which reconnecting is pointless.
fn is_fatal_close(code: u16) -> bool {
    matches!(code, 4004 | 4010 | 4011 | 4012 | 4013 | 4014)
}
