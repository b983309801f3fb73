//! Error types for stw-automation.

use stw_core::{AccountId, CoreError};
use thiserror::Error;

/// Automation error types.
///
/// Only `NotFound` and `Terminated` surface synchronously to callers;
/// everything that happens inside a tick is reported as an
/// `ActionResult` event instead.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Account not registered: {0}")]
    NotFound(AccountId),

    #[error("Orchestrator is shut down")]
    Terminated,

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// A failure while releasing one resource during teardown.
///
/// Logged and aggregated; never aborts the remaining releases.
#[derive(Debug, Clone, Error)]
#[error("Release failed for {account_id} during {stage}: {detail}")]
pub struct ResourceReleaseError {
    pub account_id: AccountId,
    pub stage: String,
    pub detail: String,
}

impl ResourceReleaseError {
    pub fn new(
        account_id: AccountId,
        stage: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            stage: stage.into(),
            detail: detail.into(),
        }
    }
}

/// Result type alias for automation operations.
pub type AutomationResult<T> = std::result::Result<T, AutomationError>;
