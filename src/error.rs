//! Error types shared across the game.

use thiserror::Error;

use crate::state::GuessStatus;

/// Why a single price fetch failed. Never crosses the price cache boundary;
/// the cache folds it into the sample's `error` field.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("HTTP error! status: {status}")]
    Http { status: u16 },

    #[error("{0}")]
    Network(String),

    #[error("Unexpected API response: {0}")]
    Parse(String),

    #[error("Unknown error occurred")]
    Unknown,
}

impl FetchError {
    /// Build a network error, mapping an empty message to `Unknown`.
    pub fn network(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            FetchError::Unknown
        } else {
            FetchError::Network(message)
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            FetchError::Http {
                status: status.as_u16(),
            }
        } else if e.is_decode() {
            FetchError::Parse(e.to_string())
        } else {
            FetchError::network(e.to_string())
        }
    }
}

/// Rejections at the guess store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("An active guess already exists")]
    ActiveGuess,

    #[error("Initial price must be positive, got {0}")]
    InvalidPrice(f64),

    #[error("Guess not found: {0}")]
    NotFound(String),

    #[error("Guess already resolved: {0}")]
    AlreadyResolved(String),

    #[error("Resolution needs status, price and timestamp together: {0}")]
    IncompleteResolution(String),

    #[error("Status cannot move from {from:?} to {to:?}")]
    StatusRegression { from: GuessStatus, to: GuessStatus },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Storage(e.to_string())
    }
}
