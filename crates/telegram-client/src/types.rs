//! Telegram Bot API types.
//!
//! Only the fields this service consumes are modeled; serde ignores the
//! rest of the (large) wire objects.

use serde::{Deserialize, Serialize};

/// Standard Bot API response envelope: `{ok, result}` on success,
/// `{ok: false, error_code, description}` on failure.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<i64>,
    pub description: Option<String>,
}

/// A single entry from `getUpdates` or a webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    /// Present when a user voted in (or retracted a vote from) a
    /// non-anonymous poll.
    pub poll_answer: Option<PollAnswer>,
}

/// A user's answer in a non-anonymous poll.
///
/// An empty `option_ids` means the user retracted their vote.
#[derive(Debug, Clone, Deserialize)]
pub struct PollAnswer {
    pub poll_id: String,
    pub user: Option<User>,
    pub option_ids: Vec<i64>,
}

/// Poll object as returned inside a `sendPoll` message.
#[derive(Debug, Clone, Deserialize)]
pub struct Poll {
    pub id: String,
    pub question: String,
    pub options: Vec<PollOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollOption {
    pub text: String,
    #[serde(default)]
    pub voter_count: i64,
}

/// Message object, reduced to what the gateway reads back.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub poll: Option<Poll>,
}

/// Bot or user account as returned by `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub username: Option<String>,
}

/// Body for `sendMessage`.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
}

/// Body for `sendPoll`.
#[derive(Debug, Clone, Serialize)]
pub struct SendPollRequest {
    pub chat_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub is_anonymous: bool,
    pub allows_multiple_answers: bool,
}

/// Body for `getUpdates`.
#[derive(Debug, Clone, Serialize)]
pub struct GetUpdatesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub timeout: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_updates: Vec<String>,
}

/// Body for `setWebhook`.
#[derive(Debug, Clone, Serialize)]
pub struct SetWebhookRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_token: Option<String>,
}
