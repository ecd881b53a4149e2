//! Terminal client for the operator-approval gateway.
//!
//! Drives the phone -> verification -> result flow against the
//! gateway's HTTP API and reports the operator's decision.

pub mod client;
pub mod config;
pub mod error;
pub mod flow;

pub use client::{CheckOutcome, GatewayApi, GatewayClient, VerifyOutcome};
pub use config::Config;
pub use error::FlowError;
pub use flow::{FlowStep, Outcome, VerificationFlow};
