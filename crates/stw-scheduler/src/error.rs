//! Error types for stw-scheduler.

use thiserror::Error;

/// Scheduler error types.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Invalid schedule rule: {field} = {value}")]
    InvalidRule { field: &'static str, value: u32 },

    #[error("Scheduler already started")]
    AlreadyStarted,
}

/// Result type alias for scheduler operations.
pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;
