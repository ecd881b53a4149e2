//! Operator-approval gateway.
//!
//! Relays phone verification submissions into an operator chat via a
//! Telegram bot: a submitted phone number becomes a chat message, a
//! submitted verification code opens an Approve/Reject poll, and the
//! operator's poll answer is recorded in a persistent ledger that the
//! HTTP API reports back to the submitting client.
//!
//! Poll answers are ingested either through a registered webhook or a
//! long-polling background task, never both.

pub mod api;
pub mod approval;
pub mod config;
pub mod error;
pub mod ledger;
pub mod notify;
pub mod poller;

pub use config::Config;
pub use error::GatewayError;
pub use ledger::{ApprovalLedger, PollRecord, Store, Verdict};
