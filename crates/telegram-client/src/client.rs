//! Telegram Bot API HTTP client.

use crate::error::TelegramError;
use crate::types::*;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Telegram Bot API client.
///
/// The bot token is stored using `SecretString` to prevent accidental
/// exposure in logs or debug output; it only surfaces when the request
/// URL is built.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    api_url: String,
    token: SecretString,
}

impl TelegramClient {
    /// Create a new client against `api_url` (normally
    /// `https://api.telegram.org`).
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TelegramError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.into(),
            token: SecretString::new(token.into()),
        })
    }

    /// Check if the Bot API is reachable and the token is valid.
    pub async fn health_check(&self) -> bool {
        self.get_me().await.is_ok()
    }

    /// Fetch the bot's own account (`getMe`).
    #[instrument(skip(self))]
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({})).await
    }

    /// Send a text message to a chat (`sendMessage`, HTML parse mode).
    ///
    /// Callers embedding untrusted text must escape it first.
    #[instrument(skip(self, text))]
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<Message, TelegramError> {
        let request = SendMessageRequest {
            chat_id: chat_id.to_string(),
            text: text.to_string(),
            parse_mode: Some("HTML".to_string()),
        };

        let message: Message = self.call("sendMessage", &request).await?;
        debug!(message_id = message.message_id, "Sent message");
        Ok(message)
    }

    /// Open a two-option poll in a chat (`sendPoll`) and return the poll.
    ///
    /// The poll is always non-anonymous: Telegram only delivers
    /// `poll_answer` updates for non-anonymous polls.
    #[instrument(skip(self, question))]
    pub async fn send_poll(
        &self,
        chat_id: &str,
        question: &str,
        options: &[&str],
    ) -> Result<Poll, TelegramError> {
        let request = SendPollRequest {
            chat_id: chat_id.to_string(),
            question: question.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            is_anonymous: false,
            allows_multiple_answers: false,
        };

        let message: Message = self.call("sendPoll", &request).await?;
        let poll = message.poll.ok_or_else(|| {
            TelegramError::UnexpectedResponse("sendPoll result carried no poll".to_string())
        })?;

        debug!(poll_id = %poll.id, "Opened poll");
        Ok(poll)
    }

    /// Fetch pending updates (`getUpdates`), in the server's ascending
    /// `update_id` order. `timeout_secs` > 0 long-polls.
    #[instrument(skip(self))]
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
        allowed_updates: &[&str],
    ) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: allowed_updates.iter().map(|u| u.to_string()).collect(),
        };

        let updates: Vec<Update> = self.call("getUpdates", &request).await?;
        debug!("Received {} updates", updates.len());
        Ok(updates)
    }

    /// Register `url` as the bot's webhook (`setWebhook`). Telegram echoes
    /// `secret_token` back in the `X-Telegram-Bot-Api-Secret-Token` header
    /// of every delivery.
    #[instrument(skip(self, secret_token))]
    pub async fn set_webhook(
        &self,
        url: &str,
        secret_token: Option<&str>,
    ) -> Result<(), TelegramError> {
        let request = SetWebhookRequest {
            url: url.to_string(),
            secret_token: secret_token.map(String::from),
        };

        let accepted: bool = self.call("setWebhook", &request).await?;
        if !accepted {
            warn!("setWebhook answered ok but did not accept the URL");
        }
        Ok(())
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token.expose_secret(), method)
    }

    /// POST a method call and unwrap the `{ok, result}` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &impl Serialize,
    ) -> Result<T, TelegramError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        match serde_json::from_str::<ApiEnvelope<T>>(&text) {
            Ok(envelope) => self.unwrap_envelope(method, envelope),
            // Non-envelope body (proxy error page, HTML, ...): report the
            // transport status instead.
            Err(_) if !status.is_success() => Err(TelegramError::Api {
                code: i64::from(status.as_u16()),
                description: text.chars().take(200).collect(),
            }),
            Err(e) => Err(TelegramError::Json(e)),
        }
    }

    fn unwrap_envelope<T>(
        &self,
        method: &str,
        envelope: ApiEnvelope<T>,
    ) -> Result<T, TelegramError> {
        if envelope.ok {
            envelope.result.ok_or_else(|| {
                TelegramError::UnexpectedResponse(format!("{} returned ok without a result", method))
            })
        } else {
            let code = envelope.error_code.unwrap_or(0);
            let description = envelope
                .description
                .unwrap_or_else(|| "unknown error".to_string());
            warn!(method, code, %description, "Telegram API call failed");
            Err(TelegramError::Api { code, description })
        }
    }
}
