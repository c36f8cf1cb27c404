//! Shared bot state and chat-side helpers.

use std::sync::Arc;

use tracing::{error, warn};

use crate::client::{ChatClient, ClientError};
use crate::config::BotConfig;
use crate::persist::PersistError;
use crate::score::ScoreKeeper;
use crate::store::{PollKeeper, QuestionKeeper};
use crate::types::{ChannelId, UserId, DEV_USER};

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Everything command handlers need: the chat backend, the three stores,
/// and the channel/user ids from configuration.
pub struct Bot {
    pub client: Arc<dyn ChatClient>,
    pub questions: QuestionKeeper,
    pub polls: PollKeeper,
    pub scores: ScoreKeeper,
    pub qotd_channel: ChannelId,
    pub developer_id: UserId,
    pub debug_channel: Option<ChannelId>,
}

impl Bot {
    pub fn new(client: Arc<dyn ChatClient>, config: &BotConfig) -> Result<Self, BotError> {
        Ok(Self {
            questions: QuestionKeeper::load(&config.data_dir)?,
            polls: PollKeeper::load(&config.data_dir)?,
            scores: ScoreKeeper::load(&config.data_dir)?,
            qotd_channel: config.qotd_channel.clone(),
            developer_id: config.developer_id.clone(),
            debug_channel: config.debug_channel.clone(),
            client,
        })
    }

    /// Post to a channel. Delivery failures are logged, not surfaced, so a
    /// flaky send never aborts the command that produced it.
    pub async fn say(&self, channel: &str, text: &str) {
        if let Err(e) = self.client.say(channel, text).await {
            warn!(channel, error = %e, "message delivery failed");
        }
    }

    /// Open the user's direct channel and post there.
    pub async fn dm(&self, user: &str, text: &str) {
        match self.client.get_direct_channel(user).await {
            Ok(channel) => self.say(&channel, text).await,
            Err(e) => warn!(user, error = %e, "could not open direct channel"),
        }
    }

    pub async fn react(&self, channel: &str, ts: &str, emoji: &str) {
        if let Err(e) = self.client.react(channel, ts, emoji).await {
            warn!(channel, error = %e, "reaction failed");
        }
    }

    /// A user's display name, from the score sheet when recorded there,
    /// otherwise from the chat backend.
    pub async fn name_for(&self, user: &str) -> String {
        if let Some(name) = self.scores.get_user_name(user).await {
            return name;
        }
        self.client.get_name_by_id(user).await
    }

    /// `<@U123>` style mention for a user id.
    pub fn reference(user: &str) -> String {
        format!("<@{user}>")
    }

    /// Strip a `<@U123>` mention down to the id. Plain text passes through.
    pub fn id_from_reference(raw: &str) -> &str {
        raw.strip_prefix("<@")
            .and_then(|s| s.strip_suffix('>'))
            .unwrap_or(raw)
    }

    pub fn is_dev(&self, user: &str) -> bool {
        user == self.developer_id
    }

    /// The identity ownership checks see. The developer acts as the
    /// sentinel id, everyone else as themselves.
    pub fn acting_id<'a>(&self, user: &'a str) -> &'a str {
        if self.is_dev(user) {
            DEV_USER
        } else {
            user
        }
    }

    /// Put the user on the score sheet (with their current display name)
    /// if they are not there yet, then award points.
    pub async fn award_points(&self, user: &str, points: i64) -> Result<(), BotError> {
        if !self.scores.user_exists(user).await {
            self.scores.add_new_user(user).await?;
            let name = self.client.get_name_by_id(user).await;
            self.scores.add_name_to_user(user, &name).await?;
        }
        self.scores.add_user_points(user, points).await?;
        Ok(())
    }

    /// Report a failed command to the operator channel, when one is
    /// configured.
    pub async fn report_failure(&self, command_text: &str, error: &BotError) {
        error!(command_text, error = %error, "command failed");
        if let Some(channel) = self.debug_channel.clone() {
            self.say(&channel, &format!("Command `{command_text}` failed: {error}"))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_round_trip() {
        assert_eq!(Bot::reference("U123"), "<@U123>");
        assert_eq!(Bot::id_from_reference("<@U123>"), "U123");
        assert_eq!(Bot::id_from_reference("U123"), "U123");
        assert_eq!(Bot::id_from_reference("<@U123"), "<@U123");
    }
}
