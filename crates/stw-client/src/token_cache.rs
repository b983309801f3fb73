//! Account-scoped token cache.
//!
//! Lives inside each account's automation service and is cleared when
//! the service is destroyed.

use crate::auth::AccessToken;
use chrono::Duration;
use parking_lot::RwLock;
use std::collections::HashMap;
use stw_core::AccountId;

/// Default slack before expiry at which a cached token is discarded.
const DEFAULT_SLACK_SECS: i64 = 30;

/// Concurrent cache of usable access tokens.
pub struct TokenCache {
    entries: RwLock<HashMap<AccountId, AccessToken>>,
    slack: Duration,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_slack(Duration::seconds(DEFAULT_SLACK_SECS))
    }

    pub fn with_slack(slack: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            slack,
        }
    }

    /// Get a token that is still usable, dropping it if stale.
    pub fn get(&self, account: &AccountId) -> Option<AccessToken> {
        let stale = {
            let entries = self.entries.read();
            match entries.get(account) {
                Some(token) if !token.is_expired(self.slack) => return Some(token.clone()),
                Some(_) => true,
                None => false,
            }
        };
        if stale {
            self.entries.write().remove(account);
        }
        None
    }

    pub fn put(&self, account: AccountId, token: AccessToken) {
        self.entries.write().insert(account, token);
    }

    /// Drop one account's token (e.g. after the service rejected it).
    pub fn invalidate(&self, account: &AccountId) {
        self.entries.write().remove(account);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}
