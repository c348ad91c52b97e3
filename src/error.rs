//! Error types for pumpdeck.

use crate::session::UserId;

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Amount error: {0}")]
    Amount(#[from] AmountError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Precondition not met: {0}")]
    PreconditionNotMet(String),

    #[error("Session expired for user {user_id}")]
    SessionExpired { user_id: UserId },
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Amount parsing and conversion errors. Always recoverable: the user is
/// re-prompted at the same conversation step.
#[derive(Debug, thiserror::Error)]
pub enum AmountError {
    #[error("not a valid decimal amount: '{0}'")]
    Unparseable(String),

    #[error("amount must not be negative: '{0}'")]
    Negative(String),

    #[error("not a valid subunit integer: '{0}'")]
    BadSubunits(String),

    #[error("amount out of range: '{0}'")]
    OutOfRange(String),
}

/// Backend gateway errors. None of these are fatal to the conversation:
/// the controller reports them and leaves local state unchanged.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),
}

/// Message-transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport API error ({code}): {description}")]
    Api { code: i64, description: String },

    #[error("invalid transport response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_domain_errors() {
        let err = Error::from(AmountError::Unparseable("abc".to_string()));
        assert_eq!(
            err.to_string(),
            "Amount error: not a valid decimal amount: 'abc'"
        );

        let err = Error::from(BackendError::Rejected {
            status: 422,
            message: "insufficient funds".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Backend error: backend rejected request (422): insufficient funds"
        );
    }

    #[test]
    fn formats_conversation_refusals() {
        assert_eq!(
            Error::InvalidInput("0.2 exceeds maximum".to_string()).to_string(),
            "Invalid input: 0.2 exceeds maximum"
        );
        assert_eq!(
            Error::PreconditionNotMet("pump amount not set".to_string()).to_string(),
            "Precondition not met: pump amount not set"
        );
        assert_eq!(
            Error::SessionExpired { user_id: 42 }.to_string(),
            "Session expired for user 42"
        );
    }
}
