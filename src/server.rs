//! Slack Events API intake.
//!
//! Slack posts every workspace event to one endpoint. Requests are
//! authenticated with the v0 signing scheme before the body is parsed, and
//! accepted messages are queued for the dispatcher so the HTTP response
//! returns inside Slack's delivery deadline.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use hmac::{Hmac, Mac};
use regex::Regex;
use serde_json::{json, Value};
use sha2::Sha256;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::bot::Bot;
use crate::client::MessageEvent;
use crate::commands;
use crate::types::{ChannelId, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Requests whose timestamp strays further than this from now are replays.
const MAX_TIMESTAMP_SKEW: i64 = 60 * 5;
const MAX_BODY_BYTES: usize = 1 << 20;

const WELCOME_MESSAGE: &str =
    "I'm QOTD Bot. Message me directly or use the `help` command to see what I can do.";

/// An accepted workspace event, queued for the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message(MessageEvent),
    MemberJoined { channel: ChannelId, user: UserId },
}

pub struct ServerState {
    pub signing_secret: String,
    /// The bot's own user id, for mention parsing. `None` disables
    /// public-channel commands.
    pub bot_user: Option<UserId>,
    pub events: mpsc::Sender<Inbound>,
}

pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/slack/events", post(slack_events))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            verify_slack_signature,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run inbound events through the command dispatcher, one at a time.
/// Failures are reported to the operator channel and the loop keeps going.
pub fn spawn_dispatcher(
    bot: Arc<Bot>,
    mut events: mpsc::Receiver<Inbound>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(inbound) = events.recv().await {
            match inbound {
                Inbound::Message(event) => {
                    if let Err(e) = commands::handle_event(&bot, &event).await {
                        bot.report_failure(&event.text, &e).await;
                    }
                }
                Inbound::MemberJoined { channel, user } => {
                    if channel == bot.qotd_channel {
                        let greeting =
                            format!("Welcome {}! {WELCOME_MESSAGE}", Bot::reference(&user));
                        bot.say(&channel, &greeting).await;
                    }
                }
            }
        }
    })
}

fn compute_signature(secret: &str, timestamp: &str, body: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(format!("v0:{timestamp}:{body}").as_bytes());
    format!("v0={}", hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

async fn verify_slack_signature(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let Some(timestamp) = header("x-slack-request-timestamp") else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    let Some(signature) = header("x-slack-signature") else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match timestamp.parse::<i64>() {
        Ok(ts) if (Utc::now().timestamp() - ts).abs() <= MAX_TIMESTAMP_SKEW => {}
        _ => {
            warn!(timestamp, "rejecting request with stale timestamp");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    let Ok(body_str) = std::str::from_utf8(&bytes) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let expected = compute_signature(&state.signing_secret, &timestamp, body_str);
    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        warn!("rejecting request with bad signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

async fn slack_events(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<Value>,
) -> Response {
    match payload["type"].as_str() {
        Some("url_verification") => {
            let challenge = payload["challenge"].as_str().unwrap_or_default();
            Json(json!({ "challenge": challenge })).into_response()
        }
        Some("event_callback") => {
            if let Some(inbound) = extract_event(&state, &payload["event"]) {
                if state.events.try_send(inbound).is_err() {
                    warn!("event queue full, dropping message");
                }
            }
            StatusCode::OK.into_response()
        }
        other => {
            debug!(kind = ?other, "ignoring event payload");
            StatusCode::OK.into_response()
        }
    }
}

/// Split a leading `<@U...>` mention off a message, returning the mentioned
/// id and the rest of the text.
fn mention_target(text: &str) -> Option<(&str, &str)> {
    static MENTION: OnceLock<Regex> = OnceLock::new();
    let re = MENTION.get_or_init(|| Regex::new(r"^<@(|[WU][A-Z0-9]+)>(.*)").expect("mention regex"));
    let caps = re.captures(text)?;
    let id = caps.get(1).map_or("", |m| m.as_str());
    let rest = caps.get(2).map_or("", |m| m.as_str());
    Some((id, rest))
}

/// Turn a raw workspace event into a dispatchable `Inbound`.
///
/// Bot messages, message subtypes (edits, joins), and our own messages are
/// dropped. In public channels only messages addressed to the bot by
/// mention count; direct messages count as-is. Channel joins pass through
/// for the dispatcher to greet.
fn extract_event(state: &ServerState, event: &Value) -> Option<Inbound> {
    match event["type"].as_str()? {
        "message" => {}
        "member_joined_channel" => {
            let channel = event["channel"].as_str()?.to_string();
            let user = event["user"].as_str()?.to_string();
            if state.bot_user.as_deref() == Some(user.as_str()) {
                return None;
            }
            return Some(Inbound::MemberJoined { channel, user });
        }
        _ => return None,
    }
    if event.get("subtype").is_some() || event.get("bot_id").is_some() {
        return None;
    }
    let channel = event["channel"].as_str()?.to_string();
    let user = event["user"].as_str()?.to_string();
    let raw_text = event["text"].as_str()?;
    let ts = event["ts"].as_str()?.to_string();

    if state.bot_user.as_deref() == Some(user.as_str()) {
        return None;
    }

    let text = match mention_target(raw_text) {
        Some((id, rest)) => {
            if state.bot_user.as_deref() != Some(id) {
                return None;
            }
            rest.trim().to_string()
        }
        None => {
            if !commands::is_channel_private(&channel) {
                return None;
            }
            raw_text.trim().to_string()
        }
    };

    Some(Inbound::Message(MessageEvent {
        channel,
        user,
        text,
        ts,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(bot_user: Option<&str>) -> ServerState {
        let (tx, _rx) = mpsc::channel(8);
        ServerState {
            signing_secret: "secret".to_string(),
            bot_user: bot_user.map(str::to_string),
            events: tx,
        }
    }

    #[test]
    fn signatures_are_stable_and_body_sensitive() {
        let a = compute_signature("secret", "12345", "payload");
        let b = compute_signature("secret", "12345", "payload");
        let c = compute_signature("secret", "12345", "other");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("v0="));
        assert_eq!(a.len(), 3 + 64);
    }

    #[test]
    fn comparison_requires_equal_bytes() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }

    #[test]
    fn mentions_split_into_id_and_rest() {
        assert_eq!(mention_target("<@U123> scores"), Some(("U123", " scores")));
        assert_eq!(mention_target("<@W9AB>hi"), Some(("W9AB", "hi")));
        assert_eq!(mention_target("plain text"), None);
        assert_eq!(mention_target("mid <@U123> text"), None);
    }

    fn message(inbound: Option<Inbound>) -> MessageEvent {
        match inbound {
            Some(Inbound::Message(m)) => m,
            other => panic!("expected a message, got {other:?}"),
        }
    }

    #[test]
    fn public_messages_need_our_mention() {
        let state = state(Some("UBOT"));
        let event = json!({
            "type": "message",
            "channel": "C1",
            "user": "U1",
            "text": "<@UBOT> hello",
            "ts": "1.0",
        });
        assert_eq!(message(extract_event(&state, &event)).text, "hello");

        let other = json!({
            "type": "message",
            "channel": "C1",
            "user": "U1",
            "text": "<@UOTHER> hello",
            "ts": "1.0",
        });
        assert!(extract_event(&state, &other).is_none());

        let unaddressed = json!({
            "type": "message",
            "channel": "C1",
            "user": "U1",
            "text": "hello",
            "ts": "1.0",
        });
        assert!(extract_event(&state, &unaddressed).is_none());
    }

    #[test]
    fn direct_messages_need_no_mention() {
        let state = state(Some("UBOT"));
        let event = json!({
            "type": "message",
            "channel": "D1",
            "user": "U1",
            "text": "scores",
            "ts": "1.0",
        });
        assert_eq!(message(extract_event(&state, &event)).text, "scores");
    }

    #[test]
    fn channel_joins_pass_through() {
        let state = state(Some("UBOT"));
        let joined = json!({
            "type": "member_joined_channel",
            "channel": "C1",
            "user": "U1",
        });
        assert_eq!(
            extract_event(&state, &joined),
            Some(Inbound::MemberJoined {
                channel: "C1".to_string(),
                user: "U1".to_string(),
            })
        );

        // The bot's own join is skipped.
        let own = json!({
            "type": "member_joined_channel",
            "channel": "C1",
            "user": "UBOT",
        });
        assert!(extract_event(&state, &own).is_none());
    }

    #[test]
    fn noise_events_are_dropped() {
        let state = state(Some("UBOT"));
        let edited = json!({
            "type": "message",
            "subtype": "message_changed",
            "channel": "D1",
            "user": "U1",
            "text": "scores",
            "ts": "1.0",
        });
        assert!(extract_event(&state, &edited).is_none());

        let from_bot = json!({
            "type": "message",
            "channel": "D1",
            "user": "UBOT",
            "text": "scores",
            "ts": "1.0",
        });
        assert!(extract_event(&state, &from_bot).is_none());

        let reaction = json!({
            "type": "reaction_added",
            "channel": "D1",
            "user": "U1",
            "ts": "1.0",
        });
        assert!(extract_event(&state, &reaction).is_none());
    }
}
