//! Configuration for pumpdeck.
//!
//! Everything comes from env vars (a local `.env` is loaded via dotenvy
//! early in startup), is validated once, and stays immutable for the
//! lifetime of the process.

use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use url::Url;

use crate::error::ConfigError;

/// Minimum wallet balance required before a session can be configured.
const DEFAULT_MIN_DEPOSIT_BNB: &str = "0.097";

/// How often the completion watcher polls the backend.
const DEFAULT_WATCHER_INTERVAL_SECS: u64 = 10;

/// Delay before the watcher's first scan.
const DEFAULT_WATCHER_INITIAL_DELAY_SECS: u64 = 5;

/// Backend HTTP timeout, matching the backend's slowest endpoints.
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Main configuration for the bot.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot credential.
    pub bot_token: SecretString,
    /// Base address of the volume-boost backend.
    pub api_base_url: Url,
    /// Minimum deposit before the ready prompt is shown.
    pub min_deposit: Decimal,
    /// Completion watcher poll interval.
    pub watcher_interval: Duration,
    /// Completion watcher initial delay.
    pub watcher_initial_delay: Duration,
    /// Timeout for backend and transport HTTP calls.
    pub http_timeout: Duration,
}

impl Config {
    /// Load and validate configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = required_env("TELEGRAM_BOT_TOKEN")?;

        let api_base_url = optional_env("API_BASE_URL")
            .unwrap_or_else(|| "http://localhost:8080".to_string());
        let api_base_url = Url::parse(&api_base_url).map_err(|e| ConfigError::InvalidValue {
            key: "API_BASE_URL".to_string(),
            message: e.to_string(),
        })?;

        let min_deposit = parse_decimal_env("MIN_DEPOSIT_BNB", DEFAULT_MIN_DEPOSIT_BNB)?;
        if min_deposit.is_sign_negative() {
            return Err(ConfigError::InvalidValue {
                key: "MIN_DEPOSIT_BNB".to_string(),
                message: "must not be negative".to_string(),
            });
        }

        let watcher_interval = Duration::from_secs(parse_u64_env(
            "WATCHER_INTERVAL_SECS",
            DEFAULT_WATCHER_INTERVAL_SECS,
        )?);
        if watcher_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "WATCHER_INTERVAL_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            api_base_url,
            min_deposit,
            watcher_interval,
            watcher_initial_delay: Duration::from_secs(DEFAULT_WATCHER_INITIAL_DELAY_SECS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        })
    }
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    match optional_env(key) {
        Some(value) => Ok(value),
        None => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_decimal_env(key: &str, default: &str) -> Result<Decimal, ConfigError> {
    let raw = optional_env(key).unwrap_or_else(|| default.to_string());
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected a decimal amount, got '{raw}'"),
    })
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64, ConfigError> {
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected an integer, got '{raw}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_defaults() {
        let value = parse_decimal_env("PUMPDECK_TEST_UNSET_DECIMAL", "0.097").unwrap();
        assert_eq!(value.to_string(), "0.097");
    }

    #[test]
    fn missing_required_var_is_an_error() {
        let err = required_env("PUMPDECK_TEST_UNSET_REQUIRED").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }
}
