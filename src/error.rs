//! Error types

use crate::types::UserId;
use thiserror::Error;

/// Main error type for the bot
#[derive(Error, Debug)]
pub enum BotError {
    /// Malformed query text. Shown to the user, never retried.
    #[error("Invalid query: {0}")]
    Input(String),

    /// Stats lookup failed or timed out. Recovered with league averages.
    #[error("Stats provider error: {0}")]
    Provider(String),

    #[error("Insufficient credits for user {0}")]
    InsufficientCredits(UserId),

    /// Confirmation for a reference with no pending payment record.
    #[error("No payment recorded for reference {0}")]
    PaymentMismatch(String),

    #[error("Payment processor error: {0}")]
    Payment(String),

    #[error("Invalid webhook signature: {0}")]
    Signature(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// Text that can be shown to the chat user.
    ///
    /// Only input and entitlement problems are explained; anything else is an
    /// operational failure and gets a generic apology.
    pub fn user_message(&self) -> String {
        match self {
            BotError::Input(msg) => format!(
                "❌ {}\n\nUse the format: <code>TeamA x TeamB</code>",
                msg
            ),
            BotError::InsufficientCredits(_) => {
                "❌ Not enough credits. Buy credits with /buy or become VIP with /vip.".to_string()
            }
            _ => "⚠️ Something went wrong on our side. Please try again in a moment.".to_string(),
        }
    }

    /// Whether the error is caused by the user rather than the system.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, BotError::Input(_) | BotError::InsufficientCredits(_))
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
