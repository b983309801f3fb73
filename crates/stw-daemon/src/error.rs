//! Daemon error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Client error: {0}")]
    Client(#[from] stw_client::ClientError),

    #[error("Automation error: {0}")]
    Automation(#[from] stw_automation::AutomationError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] stw_scheduler::SchedulerError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] stw_telemetry::TelemetryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DaemonResult<T> = Result<T, DaemonError>;
