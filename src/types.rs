use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type UserId = String;
pub type ChannelId = String;
pub type MessageTs = String;

/// Sentinel user id that bypasses ownership checks on questions and polls.
pub const DEV_USER: &str = "DEV";

/// Wrong guesses allowed per user per question.
pub const MAX_GUESSES: u32 = 3;

/// Published questions expire once they are older than this (18 hours).
pub const EXPIRY_SECONDS: i64 = 18 * 60 * 60;

/// A trivia question and its full lifecycle state.
///
/// Serialized field names match the on-disk snapshot layout, which is shared
/// with the expired-question history log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    #[serde(rename = "user_id")]
    pub submitter: UserId,
    #[serde(rename = "q_id")]
    pub id: String,
    #[serde(rename = "question_text")]
    pub text: String,
    pub correct_answers: Vec<String>,
    #[serde(default)]
    pub category: String,
    pub init_time: i64,
    #[serde(default)]
    pub publish_time: i64,
    #[serde(default)]
    pub expire_time: i64,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub just_published: bool,
    #[serde(default)]
    pub answered_by: Vec<UserId>,
    #[serde(default)]
    pub guesses: HashMap<UserId, u32>,
}

/// A poll with short-keyed votable options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Poll {
    #[serde(rename = "user_id")]
    pub submitter: UserId,
    #[serde(rename = "p_id")]
    pub id: String,
    #[serde(rename = "poll_question_text")]
    pub text: String,
    #[serde(default)]
    pub category: String,
    pub options: Vec<PollOption>,
    #[serde(default)]
    pub responses: HashMap<UserId, String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub just_published: bool,
}

/// One votable option: the key users vote with and its display label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollOption {
    pub key: String,
    pub label: String,
}

/// Result of grading a guess against a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect { guesses_left: u32 },
    AlreadyAnswered,
    MaxGuesses,
    /// The question has no accepted answers, so the submitter must grade it.
    NeedsManual,
    GaveUp,
    NotFound,
}

/// Result of publishing a question or poll by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    AlreadyPublished,
    NotFound,
}

/// Result of recording a poll vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Accepted,
    /// The vote does not name any option key on the poll.
    BadVote,
    NotFound,
}
