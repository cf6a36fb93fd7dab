//! Error types for the tickcast system.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the tickcast system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (malformed matrix shape or values).
    #[error("Data error: {0}")]
    Data(String),

    /// Insufficient data for computation.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A feature column has zero variance and cannot be standardized.
    #[error("Degenerate column {column}: zero variance")]
    DegenerateColumn {
        /// Zero-based column index.
        column: usize,
    },

    /// A raw tick message could not be turned into a price.
    #[error("Malformed tick: {0}")]
    MalformedTick(String),

    /// Classifier rejected its training input or failed to fit.
    #[error("Training error: {0}")]
    Training(String),

    /// Classifier failed to produce predictions.
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// Market data transport error.
    #[error("Feed error: {0}")]
    Feed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create an insufficient data error.
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Error::InsufficientData(msg.into())
    }

    /// Create a malformed tick error.
    pub fn malformed_tick(msg: impl Into<String>) -> Self {
        Error::MalformedTick(msg.into())
    }

    /// Create a training error.
    pub fn training(msg: impl Into<String>) -> Self {
        Error::Training(msg.into())
    }

    /// Create a prediction error.
    pub fn prediction(msg: impl Into<String>) -> Self {
        Error::Prediction(msg.into())
    }

    /// Create a feed error.
    pub fn feed(msg: impl Into<String>) -> Self {
        Error::Feed(msg.into())
    }

    /// Whether this error only invalidates the current train/predict cycle.
    ///
    /// Everything except configuration and transport errors is recoverable
    /// at the cycle boundary.
    pub fn is_cycle_recoverable(&self) -> bool {
        !matches!(self, Error::Config(_) | Error::Feed(_) | Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_column_message() {
        let err = Error::DegenerateColumn { column: 2 };
        assert_eq!(err.to_string(), "Degenerate column 2: zero variance");
    }

    #[test]
    fn test_cycle_recoverable() {
        assert!(Error::insufficient_data("short").is_cycle_recoverable());
        assert!(Error::training("mismatch").is_cycle_recoverable());
        assert!(Error::DegenerateColumn { column: 0 }.is_cycle_recoverable());
        assert!(!Error::config("bad").is_cycle_recoverable());
        assert!(!Error::feed("closed").is_cycle_recoverable());
    }
}
