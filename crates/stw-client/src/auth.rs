//! Authentication capability.
//!
//! Token acquisition mechanics live outside this system; the automation
//! core only ever asks "give me a usable token for this account".

use crate::api::BoxFuture;
use crate::error::{ClientError, ClientResult};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stw_core::AccountId;

/// A bearer token with its expiry instant.
#[derive(Clone)]
pub struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// A token without a known expiry (operator-supplied long-lived token).
    pub fn long_lived(token: impl Into<String>) -> Self {
        Self::new(token, Utc::now() + Duration::days(365))
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Expired, or within `slack` of expiring.
    pub fn is_expired(&self, slack: Duration) -> bool {
        Utc::now() + slack >= self.expires_at
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Hands out access tokens for accounts.
pub trait AuthProvider: Send + Sync {
    fn access_token(&self, account: AccountId) -> BoxFuture<'_, ClientResult<AccessToken>>;
}

/// Shared, dynamically-dispatched auth provider.
pub type DynAuthProvider = Arc<dyn AuthProvider>;

/// Auth provider backed by operator-supplied tokens.
///
/// The daemon is handed one long-lived token per account at startup;
/// rotating them means restarting with new configuration.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    tokens: HashMap<AccountId, String>,
}

impl StaticTokenProvider {
    pub fn new(tokens: HashMap<AccountId, String>) -> Self {
        Self { tokens }
    }

    pub fn insert(&mut self, account: AccountId, token: impl Into<String>) {
        self.tokens.insert(account, token.into());
    }
}

impl AuthProvider for StaticTokenProvider {
    fn access_token(&self, account: AccountId) -> BoxFuture<'_, ClientResult<AccessToken>> {
        let result = match self.tokens.get(&account) {
            Some(token) => Ok(AccessToken::long_lived(token.clone())),
            None => Err(ClientError::Unauthorized(format!(
                "no token configured for account {account}"
            ))),
        };
        Box::pin(async move { result })
    }
}
