//! # Bot Configuration Module
//!
//! Configuration structures for the order bot, read from the environment
//! (after `dotenv` has loaded any `.env` file).

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

// Constants for bot configuration
pub const DEFAULT_PREFIX: &str = "orderbot";
pub const DEFAULT_CHANNEL: &str = "#seamless-thursday";
pub const DEFAULT_USERNAME: &str = "OrderBot";
pub const DEFAULT_ICON: &str = ":seamless:";
pub const DEFAULT_RESTAURANTS_FILE: &str = "restaurantList.json";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5000";
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_EXPORT_THRESHOLD: usize = 15;

/// Order store settings
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend connection URL
    pub redis_url: String,
    /// Upper bound for a single store call
    pub timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
        }
    }
}

/// Settings for uploading the admin order table as a file
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Bearer token for the chat platform's upload API; `None` disables uploads
    pub token: Option<String>,
    /// `list: all` row count above which the table goes out as a file
    pub threshold: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            token: None,
            threshold: DEFAULT_EXPORT_THRESHOLD,
        }
    }
}

/// Configuration structure for the bot
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Prefix token that addresses the bot, also the key namespace
    pub prefix: String,
    /// Channel replies are posted to
    pub channel: String,
    /// Display name on replies
    pub username: String,
    /// Icon emoji on replies
    pub icon_emoji: String,
    /// Path to the restaurant alias file
    pub restaurants_file: String,
    /// Statically configured admin ids
    pub admins: Vec<String>,
    /// Webhook listen address
    pub bind_address: String,
    pub store: StoreConfig,
    pub export: ExportConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            icon_emoji: DEFAULT_ICON.to_string(),
            restaurants_file: DEFAULT_RESTAURANTS_FILE.to_string(),
            admins: Vec::new(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            store: StoreConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl BotConfig {
    /// Build the configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let timeout_secs = match lookup("ORDERBOT_STORE_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("ORDERBOT_STORE_TIMEOUT_SECS is not a number: {raw}"))?,
            None => DEFAULT_STORE_TIMEOUT_SECS,
        };

        let threshold = match lookup("ORDERBOT_EXPORT_THRESHOLD") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("ORDERBOT_EXPORT_THRESHOLD is not a number: {raw}"))?,
            None => DEFAULT_EXPORT_THRESHOLD,
        };

        let admins = lookup("ORDERBOT_ADMINS")
            .map(|raw| {
                raw.split(',')
                    .map(|id| id.trim().to_lowercase())
                    .filter(|id| !id.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            prefix: text("ORDERBOT_PREFIX", defaults.prefix).to_lowercase(),
            channel: text("ORDERBOT_CHANNEL", defaults.channel),
            username: text("ORDERBOT_USERNAME", defaults.username),
            icon_emoji: text("ORDERBOT_ICON", defaults.icon_emoji),
            restaurants_file: text("ORDERBOT_RESTAURANTS", defaults.restaurants_file),
            admins,
            bind_address: text("ORDERBOT_BIND", defaults.bind_address),
            store: StoreConfig {
                redis_url: text("REDIS_URL", defaults.store.redis_url),
                timeout: Duration::from_secs(timeout_secs),
            },
            export: ExportConfig {
                token: lookup("SLACK_TOKEN")
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty()),
                threshold,
            },
        })
    }
}
