//! Environment-driven configuration.

use std::path::PathBuf;

use crate::types::{ChannelId, UserId};

const DEFAULT_PORT: u16 = 8807;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for env var {0}")]
    Invalid(&'static str),
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub signing_secret: String,
    /// Channel where questions, announcements, and points are posted.
    pub qotd_channel: ChannelId,
    pub developer_id: UserId,
    /// Operator channel for dispatch-failure reports. Optional.
    pub debug_channel: Option<ChannelId>,
    pub data_dir: PathBuf,
    pub port: u16,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = require("SLACK_BOT_TOKEN")?;
        let signing_secret = require("SLACK_SIGNING_SECRET")?;
        let qotd_channel = require("QOTD_CHANNEL")?;
        let developer_id = require("DEVELOPER_ID")?;
        let debug_channel = std::env::var("DEBUG_CHANNEL").ok().filter(|v| !v.is_empty());
        let data_dir = std::env::var("DATA_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| ".".to_string())
            .into();
        let port = match std::env::var("PORT") {
            Ok(v) if !v.is_empty() => v.parse().map_err(|_| ConfigError::Invalid("PORT"))?,
            _ => DEFAULT_PORT,
        };
        Ok(Self {
            bot_token,
            signing_secret,
            qotd_channel,
            developer_id,
            debug_channel,
            data_dir,
            port,
        })
    }
}
