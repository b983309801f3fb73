//! Error types for stw-telemetry.

use thiserror::Error;

/// Telemetry error types.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Logging initialization failed: {0}")]
    Init(String),
}

/// Result type alias for telemetry operations.
pub type TelemetryResult<T> = std::result::Result<T, TelemetryError>;
