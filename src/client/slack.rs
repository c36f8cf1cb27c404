//! Slack Web API client.
//!
//! Slack rate-limits chat methods to roughly one call per second, so every
//! outbound call waits for a minimum spacing since the previous one.
//! Transient transport failures retry on a fixed backoff before giving up.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{ChatClient, ClientError};
use crate::types::{ChannelId, UserId};

const API_BASE: &str = "https://slack.com/api";
const MIN_CALL_SPACING: Duration = Duration::from_secs(1);
const RETRY_BACKOFF: Duration = Duration::from_secs(3);
const MAX_ATTEMPTS: u32 = 3;
const BOT_EMOJI: &str = ":robot_face:";

pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    last_call: Mutex<Option<Instant>>,
    names: RwLock<HashMap<UserId, String>>,
}

impl SlackClient {
    pub fn new(token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            token,
            last_call: Mutex::new(None),
            names: RwLock::new(HashMap::new()),
        }
    }

    /// Wait until at least `MIN_CALL_SPACING` has passed since the previous
    /// call. The lock is held across the sleep so concurrent callers queue.
    async fn throttle(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < MIN_CALL_SPACING {
                tokio::time::sleep(MIN_CALL_SPACING - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn api_call(&self, method: &str, payload: Value) -> Result<Value, ClientError> {
        let url = format!("{API_BASE}/{method}");
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.throttle().await;
            match self
                .http
                .post(&url)
                .bearer_auth(&self.token)
                .json(&payload)
                .send()
                .await
            {
                Ok(resp) => {
                    let body: Value = resp.json().await?;
                    if body["ok"].as_bool().unwrap_or(false) {
                        debug!(method, "slack call ok");
                        return Ok(body);
                    }
                    let err = body["error"].as_str().unwrap_or("unknown").to_string();
                    return Err(ClientError::Api(format!("{method}: {err}")));
                }
                Err(e) if attempt < MAX_ATTEMPTS => {
                    warn!(method, attempt, error = %e, "slack call failed, retrying");
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Resolve the bot's own user id, for mention parsing.
    pub async fn auth_test(&self) -> Result<UserId, ClientError> {
        let body = self.api_call("auth.test", json!({})).await?;
        body["user_id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::Api("auth.test: missing user_id".to_string()))
    }
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn say(&self, channel: &str, text: &str) -> Result<(), ClientError> {
        self.api_call(
            "chat.postMessage",
            json!({
                "channel": channel,
                "text": text,
                "icon_emoji": BOT_EMOJI,
            }),
        )
        .await?;
        Ok(())
    }

    async fn react(&self, channel: &str, ts: &str, emoji: &str) -> Result<(), ClientError> {
        self.api_call(
            "reactions.add",
            json!({
                "channel": channel,
                "timestamp": ts,
                "name": emoji,
            }),
        )
        .await?;
        Ok(())
    }

    async fn get_direct_channel(&self, user: &str) -> Result<ChannelId, ClientError> {
        let body = self.api_call("conversations.open", json!({ "users": user })).await?;
        body["channel"]["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ClientError::Api("conversations.open: missing channel id".to_string()))
    }

    async fn get_name_by_id(&self, user: &str) -> String {
        // Slack user ids start with U or W. Anything else (the developer
        // sentinel, for instance) is already a name.
        if !user.starts_with('U') && !user.starts_with('W') {
            return user.to_string();
        }
        if let Some(name) = self.names.read().await.get(user) {
            return name.clone();
        }
        match self.api_call("users.info", json!({ "user": user })).await {
            Ok(body) => {
                let profile = &body["user"]["profile"];
                let name = profile["display_name"]
                    .as_str()
                    .filter(|s| !s.is_empty())
                    .or_else(|| body["user"]["real_name"].as_str())
                    .unwrap_or(user)
                    .to_string();
                self.names.write().await.insert(user.to_string(), name.clone());
                name
            }
            Err(e) => {
                warn!(user, error = %e, "name lookup failed");
                user.to_string()
            }
        }
    }

    async fn refresh_user_list(&self) -> Result<usize, ClientError> {
        let body = self.api_call("users.list", json!({})).await?;
        let members = body["members"]
            .as_array()
            .ok_or_else(|| ClientError::Api("users.list: missing members".to_string()))?;
        let mut names = self.names.write().await;
        names.clear();
        for member in members {
            let id = match member["id"].as_str() {
                Some(id) => id,
                None => continue,
            };
            let name = member["profile"]["display_name"]
                .as_str()
                .filter(|s| !s.is_empty())
                .or_else(|| member["real_name"].as_str())
                .unwrap_or(id);
            names.insert(id.to_string(), name.to_string());
        }
        Ok(names.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_slack_ids_resolve_without_network() {
        let client = SlackClient::new("xoxb-test".to_string());
        assert_eq!(client.get_name_by_id("DEV").await, "DEV");
        assert_eq!(client.get_name_by_id("somebody").await, "somebody");
    }

    #[tokio::test]
    async fn cached_names_resolve_without_network() {
        let client = SlackClient::new("xoxb-test".to_string());
        client
            .names
            .write()
            .await
            .insert("U123".to_string(), "Ada".to_string());
        assert_eq!(client.get_name_by_id("U123").await, "Ada");
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_enforces_minimum_spacing() {
        let client = SlackClient::new("xoxb-test".to_string());
        let start = Instant::now();
        client.throttle().await;
        client.throttle().await;
        client.throttle().await;
        assert!(start.elapsed() >= 2 * MIN_CALL_SPACING);
    }
}
