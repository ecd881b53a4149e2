//! Configuration for the approval gateway.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Telegram bot configuration
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Webhook ingestion configuration
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Update poller configuration
    #[serde(default)]
    pub poller: PollerConfig,

    /// Approval ledger storage configuration
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API token; without it the relay endpoints answer 500
    pub bot_token: Option<String>,

    /// Operator chat the bot posts into
    pub chat_id: Option<String>,

    /// Bot API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// HTTP timeout for bot API calls
    #[serde(with = "humantime_serde", default = "default_telegram_timeout")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConfig {
    /// Public base URL of this service; setting it selects webhook
    /// ingestion instead of the poller
    pub public_url: Option<String>,

    /// Secret echoed back by Telegram on every webhook delivery
    pub secret_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollerConfig {
    /// Enable the getUpdates poller when no webhook is configured
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Pause between polls
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub interval: Duration,

    /// Long-poll window for getUpdates; must stay under the HTTP timeout
    #[serde(with = "humantime_serde", default = "default_long_poll_timeout")]
    pub long_poll_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Path to the ledger file
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,

    /// Enable persistence (if false, the ledger is in-memory only)
    #[serde(default = "default_true")]
    pub persist: bool,

    /// How long poll records are kept before pruning
    #[serde(with = "humantime_serde", default = "default_ledger_ttl")]
    pub ttl: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Global requests per minute
    #[serde(default = "default_global_rpm")]
    pub global_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default implementations
impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_url: default_api_url(),
            timeout: default_telegram_timeout(),
        }
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_poll_interval(),
            long_poll_timeout: default_long_poll_timeout(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
            persist: true,
            ttl: default_ledger_ttl(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_port(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            global_per_minute: default_global_rpm(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_api_url() -> String {
    "https://api.telegram.org".into()
}

fn default_telegram_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_long_poll_timeout() -> Duration {
    Duration::from_secs(25)
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("/data/approvals.json")
}

fn default_ledger_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_listen_addr() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

fn default_global_rpm() -> u32 {
    60
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    // Chat ids like "-1001234" must stay strings
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
