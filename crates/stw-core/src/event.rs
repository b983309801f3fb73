//! Outbound notification payloads.
//!
//! The core only produces events; the transport to the UI layer is the
//! surrounding application's concern.

use crate::account::AccountId;
use crate::action::ActionKind;
use crate::result::ActionResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted by the orchestrator and the global scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AutomationEvent {
    /// One tick completed (any status).
    Action(ActionResult),
    /// An action was force-disabled after a fatal tick; the operator
    /// should re-authenticate the account.
    ActionDisabled {
        account_id: AccountId,
        kind: ActionKind,
        reason: String,
    },
    /// An account joined the registry.
    AccountAdded { account_id: AccountId },
    /// An account left the registry and its resources were released.
    AccountRemoved { account_id: AccountId },
    /// The daily reset fired: refresh world state and run the bulk
    /// anti-cheat check for whichever accounts are loaded.
    DailyRefresh { fired_at: DateTime<Utc> },
}

impl AutomationEvent {
    /// Account this event concerns, if any.
    pub fn account_id(&self) -> Option<&AccountId> {
        match self {
            AutomationEvent::Action(result) => Some(&result.account_id),
            AutomationEvent::ActionDisabled { account_id, .. }
            | AutomationEvent::AccountAdded { account_id }
            | AutomationEvent::AccountRemoved { account_id } => Some(account_id),
            AutomationEvent::DailyRefresh { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = AutomationEvent::AccountAdded {
            account_id: AccountId::from("acct-1"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "account-added");
        assert_eq!(json["account_id"], "acct-1");
    }

    #[test]
    fn test_daily_refresh_has_no_account() {
        let event = AutomationEvent::DailyRefresh {
            fired_at: Utc::now(),
        };
        assert!(event.account_id().is_none());
    }
}
