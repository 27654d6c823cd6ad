//! Error types for mood-charts

use std::time::Duration;

use thiserror::Error;

use crate::window::WindowType;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A window name that the selector should never have produced.
    #[error("Invalid window type: '{0}'")]
    InvalidWindowType(String),

    /// The all-time window was requested before the first log entry is known.
    #[error("The all-time window needs an earliest record date")]
    MissingEarliestRecord,

    #[error("The {0} window cannot be stepped")]
    NotSteppable(WindowType),

    #[error("No window has been selected yet")]
    NoActiveWindow,

    #[error("Network error: {0}")]
    Network(String),

    /// No records in the requested range. Rendered as an empty chart.
    #[error("No records found")]
    NotFound,

    #[error("Fetch timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),

    #[error("Date out of range: {0}")]
    DateOutOfRange(String),

    #[error("Mood {0} is outside the [-50, 50] scale")]
    InvalidMood(i64),

    #[error("{0}")]
    Other(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an "other" error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a date-out-of-range error
    pub fn date_out_of_range(msg: impl Into<String>) -> Self {
        Self::DateOutOfRange(msg.into())
    }

    /// Whether a fetch failing with this error should still render (as empty).
    #[must_use]
    pub const fn is_empty_result(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
