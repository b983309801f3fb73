//! Per-tick outcome types.

use crate::account::AccountId;
use crate::action::ActionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Correlation id for one executed tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickId(String);

impl TickId {
    /// Create a new unique tick ID.
    ///
    /// Format: `stw_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("stw_{ts}_{uuid_short}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TickId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome classification for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionStatus {
    /// The API interaction completed and did something.
    Success,
    /// The API interaction completed but there was nothing to do.
    Empty,
    /// The tick failed after exhausting its retry budget; the next
    /// scheduled tick proceeds normally.
    TransientFailure,
    /// Authentication/authorization failure; the action gets disabled
    /// until the operator re-authenticates.
    FatalFailure,
}

impl ActionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ActionStatus::TransientFailure | ActionStatus::FatalFailure
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ActionStatus::FatalFailure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Success => "success",
            ActionStatus::Empty => "empty",
            ActionStatus::TransientFailure => "transient-failure",
            ActionStatus::FatalFailure => "fatal-failure",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one executed tick, forwarded to the notification sink.
///
/// Never persisted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub tick_id: TickId,
    pub account_id: AccountId,
    pub kind: ActionKind,
    pub status: ActionStatus,
    /// API payload on success, error detail on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl ActionResult {
    fn new(
        tick_id: TickId,
        account_id: AccountId,
        kind: ActionKind,
        status: ActionStatus,
    ) -> Self {
        Self {
            tick_id,
            account_id,
            kind,
            status,
            payload: None,
            detail: None,
            completed_at: Utc::now(),
        }
    }

    pub fn success(
        tick_id: TickId,
        account_id: AccountId,
        kind: ActionKind,
        payload: Value,
    ) -> Self {
        let mut result = Self::new(tick_id, account_id, kind, ActionStatus::Success);
        result.payload = Some(payload);
        result
    }

    pub fn empty(tick_id: TickId, account_id: AccountId, kind: ActionKind) -> Self {
        Self::new(tick_id, account_id, kind, ActionStatus::Empty)
    }

    pub fn transient(
        tick_id: TickId,
        account_id: AccountId,
        kind: ActionKind,
        detail: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(tick_id, account_id, kind, ActionStatus::TransientFailure);
        result.detail = Some(detail.into());
        result
    }

    pub fn fatal(
        tick_id: TickId,
        account_id: AccountId,
        kind: ActionKind,
        detail: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(tick_id, account_id, kind, ActionStatus::FatalFailure);
        result.detail = Some(detail.into());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_id_format() {
        let id = TickId::new();
        assert!(id.as_str().starts_with("stw_"));
        assert_eq!(id.as_str().split('_').count(), 3);
    }

    #[test]
    fn test_status_predicates() {
        assert!(!ActionStatus::Success.is_failure());
        assert!(!ActionStatus::Empty.is_failure());
        assert!(ActionStatus::TransientFailure.is_failure());
        assert!(ActionStatus::FatalFailure.is_failure());
        assert!(ActionStatus::FatalFailure.is_fatal());
        assert!(!ActionStatus::TransientFailure.is_fatal());
    }

    #[test]
    fn test_result_constructors() {
        let account = AccountId::from("acct-1");
        let result = ActionResult::transient(
            TickId::new(),
            account.clone(),
            ActionKind::ClaimRewards,
            "rate limited",
        );
        assert_eq!(result.status, ActionStatus::TransientFailure);
        assert_eq!(result.detail.as_deref(), Some("rate limited"));
        assert!(result.payload.is_none());
        assert_eq!(result.account_id, account);
    }
}
