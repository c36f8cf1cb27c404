//! Chat backend abstraction.

pub mod slack;

use async_trait::async_trait;

use crate::types::{ChannelId, MessageTs, UserId};

pub use slack::SlackClient;

/// An inbound chat message, already stripped down to what dispatch needs.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub channel: ChannelId,
    pub user: UserId,
    pub text: String,
    pub ts: MessageTs,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chat api error: {0}")]
    Api(String),
}

/// Everything the bot needs from a chat backend.
///
/// Production talks to Slack; tests substitute a recording double.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Post a message to a channel.
    async fn say(&self, channel: &str, text: &str) -> Result<(), ClientError>;

    /// Add an emoji reaction to a message.
    async fn react(&self, channel: &str, ts: &str, emoji: &str) -> Result<(), ClientError>;

    /// Open (or look up) the direct-message channel with a user.
    async fn get_direct_channel(&self, user: &str) -> Result<ChannelId, ClientError>;

    /// Resolve a user id to a display name. Falls back to the id itself
    /// when the backend cannot resolve it.
    async fn get_name_by_id(&self, user: &str) -> String;

    /// Re-seed the display-name cache. Returns the number of names cached.
    async fn refresh_user_list(&self) -> Result<usize, ClientError>;
}
