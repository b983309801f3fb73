//! Error types for stw-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid interval: {0}s (must be at least 1s)")]
    InvalidInterval(u64),

    #[error("Invalid action config: {0}")]
    InvalidConfig(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
