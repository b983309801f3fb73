//! Read-only registry views returned to the external controller.

use crate::account::AccountId;
use crate::action::{ActionConfig, ActionSettings};
use serde::{Deserialize, Serialize};

/// One account's automation state at snapshot time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    pub account_id: AccountId,
    pub actions: Vec<ActionConfig>,
}

impl AccountState {
    pub fn from_settings(account_id: AccountId, settings: &ActionSettings) -> Self {
        Self {
            account_id,
            actions: settings.configs().cloned().collect(),
        }
    }

    pub fn enabled_count(&self) -> usize {
        self.actions.iter().filter(|a| a.enabled).count()
    }
}

/// Snapshot of the full registry, sorted by account id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub accounts: Vec<AccountState>,
}

impl RegistrySnapshot {
    pub fn new(mut accounts: Vec<AccountState>) -> Self {
        accounts.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        Self { accounts }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn get(&self, account_id: &AccountId) -> Option<&AccountState> {
        self.accounts.iter().find(|a| &a.account_id == account_id)
    }
}
