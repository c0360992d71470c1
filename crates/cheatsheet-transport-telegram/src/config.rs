//! Telegram transport settings.

use cheatsheet_core::config::InferenceSettings;
use config::ConfigError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Telegram transport settings loaded from environment variables.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TelegramSettings {
    /// Telegram Bot API token; without it every update is acknowledged and ignored.
    pub telegram_bot_token: Option<String>,
    /// Path the webhook is served on.
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
    /// Address the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Whether to show the "typing" indicator while an answer is prepared.
    #[serde(default = "default_typing_indicator")]
    pub typing_indicator: bool,
}

fn default_webhook_path() -> String {
    "/".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

const fn default_typing_indicator() -> bool {
    true
}

/// Combined settings used by the Telegram transport layer.
#[derive(Clone)]
pub struct BotSettings {
    /// Inference settings shared with the core clients.
    pub inference: Arc<InferenceSettings>,
    /// Telegram-specific settings.
    pub telegram: Arc<TelegramSettings>,
}

impl BotSettings {
    /// Create a new combined settings bundle.
    #[must_use]
    pub fn new(inference: InferenceSettings, telegram: TelegramSettings) -> Self {
        Self {
            inference: Arc::new(inference),
            telegram: Arc::new(telegram),
        }
    }
}

impl TelegramSettings {
    /// Create new settings by loading from environment and files.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        cheatsheet_core::config::build_config()?.try_deserialize()
    }

    /// Returns the bot token if one is configured.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.telegram_bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Webhook path normalized to start with `/`.
    #[must_use]
    pub fn normalized_webhook_path(&self) -> String {
        let trimmed = self.webhook_path.trim();
        if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        }
    }
}

/// Timeout (seconds) for Bot API calls, file downloads included.
pub const TELEGRAM_HTTP_TIMEOUT_SECS: u64 = 30;
/// Time-to-live (seconds) for media group ledger entries.
/// Default: 1 day.
pub const GROUP_LEDGER_TTL_SECS: u64 = 86_400;
/// Maximum ledger capacity (number of media groups).
pub const GROUP_LEDGER_MAX_SIZE: u64 = 100_000;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// Get Bot API timeout from env or default.
///
/// Environment variable: `TELEGRAM_HTTP_TIMEOUT_SECS`.
#[must_use]
pub fn get_telegram_http_timeout_secs() -> u64 {
    env_u64("TELEGRAM_HTTP_TIMEOUT_SECS", TELEGRAM_HTTP_TIMEOUT_SECS)
}

/// Get ledger TTL from env or default.
///
/// Environment variable: `GROUP_LEDGER_TTL_SECS`.
#[must_use]
pub fn get_group_ledger_ttl() -> u64 {
    env_u64("GROUP_LEDGER_TTL_SECS", GROUP_LEDGER_TTL_SECS)
}

/// Get ledger max size from env or default.
///
/// Environment variable: `GROUP_LEDGER_MAX_SIZE`.
#[must_use]
pub fn get_group_ledger_max_size() -> u64 {
    env_u64("GROUP_LEDGER_MAX_SIZE", GROUP_LEDGER_MAX_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_blank_is_missing() {
        let mut settings = TelegramSettings {
            telegram_bot_token: Some("  ".to_string()),
            ..TelegramSettings::default()
        };
        assert_eq!(settings.token(), None);

        settings.telegram_bot_token = Some("123:abc".to_string());
        assert_eq!(settings.token(), Some("123:abc"));
    }

    #[test]
    fn test_webhook_path_normalization() {
        let mut settings = TelegramSettings {
            webhook_path: "telegram/webhook".to_string(),
            ..TelegramSettings::default()
        };
        assert_eq!(settings.normalized_webhook_path(), "/telegram/webhook");

        settings.webhook_path = "/".to_string();
        assert_eq!(settings.normalized_webhook_path(), "/");
    }

    #[test]
    fn test_env_u64_falls_back() {
        assert_eq!(env_u64("CHEATSHEET_TEST_UNSET_VARIABLE", 42), 42);
    }
}
