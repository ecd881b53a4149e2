//! Configuration for the flow client.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Gateway connection configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the approval gateway
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Pause between approval checks while a decision is pending
    #[serde(with = "humantime_serde", default = "default_check_interval")]
    pub check_interval: Duration,

    /// How many approval checks to attempt before giving up
    #[serde(default = "default_max_checks")]
    pub max_checks: u32,

    /// HTTP timeout for gateway calls
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default implementations
impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            check_interval: default_check_interval(),
            max_checks: default_max_checks(),
            timeout: default_timeout(),
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
fn default_base_url() -> String {
    "http://localhost:8080".into()
}

fn default_check_interval() -> Duration {
    Duration::from_secs(3)
}

fn default_max_checks() -> u32 {
    20
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_log_level() -> String {
    "warn".into()
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
                    .try_parsing(false),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();

        assert_eq!(config.gateway.base_url, "http://localhost:8080");
        assert_eq!(config.gateway.check_interval, Duration::from_secs(3));
        assert_eq!(config.gateway.max_checks, 20);
        assert_eq!(config.gateway.timeout, Duration::from_secs(10));
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_humantime_interval() {
        let config: Config =
            serde_json::from_str(r#"{"gateway": {"check_interval": "500ms"}}"#).unwrap();
        assert_eq!(config.gateway.check_interval, Duration::from_millis(500));
    }
}
