//! Action API capability trait.
//!
//! Trait-based abstraction over the game service's automation endpoints.
//! This allows for:
//! - Dependency injection for testing
//! - Keeping concrete payload shapes out of the automation core

use crate::auth::AccessToken;
use crate::error::ClientResult;
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use stw_core::{AccountId, ActionKind};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Outcome of one API interaction cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    /// The action did something; payload is the service response.
    Completed(Value),
    /// The action ran but there was nothing to act on (no rewards
    /// pending, no matching alerts, no boosts queued).
    Nothing,
}

impl ApiOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, ApiOutcome::Nothing)
    }
}

/// One named automation action against the external API.
pub trait ApiClient: Send + Sync {
    /// Perform exactly one interaction cycle for `kind` on `account`.
    fn perform_action(
        &self,
        account: AccountId,
        kind: ActionKind,
        params: Value,
        token: AccessToken,
    ) -> BoxFuture<'_, ClientResult<ApiOutcome>>;
}

/// Shared, dynamically-dispatched API client.
pub type DynApiClient = Arc<dyn ApiClient>;

/// Scripted API client for testing.
///
/// Records every call and plays back scripted outcomes in order,
/// falling back to a default outcome once the script runs out.
pub struct ScriptedApiClient {
    calls: parking_lot::Mutex<Vec<(AccountId, ActionKind)>>,
    script: parking_lot::Mutex<VecDeque<ClientResult<ApiOutcome>>>,
    default_outcome: parking_lot::Mutex<ClientResult<ApiOutcome>>,
    /// Artificial latency applied to every call.
    delay: parking_lot::Mutex<Option<Duration>>,
}

impl Default for ScriptedApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedApiClient {
    pub fn new() -> Self {
        Self {
            calls: parking_lot::Mutex::new(Vec::new()),
            script: parking_lot::Mutex::new(VecDeque::new()),
            default_outcome: parking_lot::Mutex::new(Ok(ApiOutcome::Nothing)),
            delay: parking_lot::Mutex::new(None),
        }
    }

    /// Queue an outcome for the next unscripted call.
    pub fn push_outcome(&self, outcome: ClientResult<ApiOutcome>) {
        self.script.lock().push_back(outcome);
    }

    /// Set the outcome returned once the script is exhausted.
    pub fn set_default_outcome(&self, outcome: ClientResult<ApiOutcome>) {
        *self.default_outcome.lock() = outcome;
    }

    /// Delay every call by `delay` before resolving.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Get recorded calls.
    pub fn calls(&self) -> Vec<(AccountId, ActionKind)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls recorded for one account.
    pub fn calls_for(&self, account: &AccountId) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(id, _)| id == account)
            .count()
    }
}

impl ApiClient for ScriptedApiClient {
    fn perform_action(
        &self,
        account: AccountId,
        kind: ActionKind,
        _params: Value,
        _token: AccessToken,
    ) -> BoxFuture<'_, ClientResult<ApiOutcome>> {
        Box::pin(async move {
            self.calls.lock().push((account, kind));
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let scripted = self.script.lock().pop_front();
            scripted.unwrap_or_else(|| self.default_outcome.lock().clone())
        })
    }
}
