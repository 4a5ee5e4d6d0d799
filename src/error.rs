// src/error.rs

//! Unified error handling for the relay.

use std::fmt;

use thiserror::Error;

use crate::models::ItemStatus;

/// Result type alias for relay operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Regular expression failed to compile
    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Harvesting error
    #[error("Harvest error for {destination}: {message}")]
    Harvest {
        destination: String,
        message: String,
    },

    /// Status update for an item the store does not know
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// Attempt to move an item out of a terminal status
    #[error("Invalid status transition for {key}: {from} -> {to}")]
    InvalidTransition {
        key: String,
        from: ItemStatus,
        to: ItemStatus,
    },

    /// Header and continuation marks leave no room for the body
    #[error("No room for body: header and marks take {used} of {max_length}")]
    NoBudget { used: usize, max_length: usize },
}

/// Classified outcome of a rejected post.
///
/// The delivery driver depends only on this three-way split, never on the
/// provider's raw error encoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The provider already holds this exact text
    #[error("duplicate status: {0}")]
    Duplicate(String),

    /// Rate limit or daily quota exhausted
    #[error("over update limit: {0}")]
    OverLimit(String),

    /// Any other rejection (too long, malformed, transport, unknown)
    #[error("rejected: {0}")]
    Rejected(String),
}

impl AppError {
    /// Create a pattern compilation error.
    pub fn pattern(pattern: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Pattern {
            pattern: pattern.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a harvest error with the destination as context.
    pub fn harvest(destination: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Harvest {
            destination: destination.into(),
            message: message.to_string(),
        }
    }
}
