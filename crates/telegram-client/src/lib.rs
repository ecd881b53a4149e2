//! Telegram Bot API client.
//!
//! Thin typed wrapper over the handful of Bot API methods the approval
//! gateway uses: `sendMessage`, `sendPoll`, `getUpdates`, `setWebhook`
//! and `getMe`. One network call per operation; no retries.

mod client;
mod error;
mod types;

pub use client::TelegramClient;
pub use error::TelegramError;
pub use types::*;
