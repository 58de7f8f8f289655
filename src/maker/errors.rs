//! Market maker error types

use thiserror::Error;

/// Errors that can occur while running the market maker
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MakerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Streaming feed has not produced data yet")]
    FeedNotReady,

    #[error("Position data unavailable: {0}")]
    PositionDataUnavailable(String),

    #[error("Order submission rejected: {0}")]
    Submission(String),

    #[error("Exchange error: {0}")]
    Exchange(String),

    #[error("Giving up after {count} consecutive errors")]
    TooManyErrors { count: u32 },
}

impl MakerError {
    /// Whether the cycle can not safely continue after this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MakerError::InvalidConfig(_)
                | MakerError::PositionDataUnavailable(_)
                | MakerError::TooManyErrors { .. }
        )
    }
}

impl From<config::ConfigError> for MakerError {
    fn from(err: config::ConfigError) -> Self {
        MakerError::InvalidConfig(err.to_string())
    }
}

/// Result type for market maker operations
pub type MakerResult<T> = std::result::Result<T, MakerError>;
