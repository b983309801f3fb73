//! Account-scoped automation service.
//!
//! Pairs an [`AccountProcess`] with the resources it leans on (the
//! token cache today) and releases everything exactly once on destroy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use stw_client::TokenCache;
use stw_core::{AccountId, AccountState, ActionPatch, ActionSettings, AutomationEvent};
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{AutomationError, AutomationResult, ResourceReleaseError};
use crate::executor::ActionExecutor;
use crate::process::AccountProcess;

/// One account's automation: process, settings and owned resources.
///
/// Structural changes (patching actions, destroying) serialize on an
/// internal lock, so a patch racing a removal either lands before the
/// teardown or observes the service as gone.
pub struct AutomationService {
    account_id: AccountId,
    process: AccountProcess,
    tokens: Arc<TokenCache>,
    settings: Arc<RwLock<ActionSettings>>,
    lifecycle: Mutex<()>,
    destroyed: AtomicBool,
}

impl AutomationService {
    /// Build a service with every action present but disabled; no
    /// timer runs until the first enable.
    pub fn new(
        account_id: AccountId,
        executor: Arc<ActionExecutor>,
        events: mpsc::Sender<AutomationEvent>,
    ) -> Self {
        let tokens = Arc::new(TokenCache::new());
        let settings = Arc::new(RwLock::new(ActionSettings::default_disabled()));
        let process = AccountProcess::new(
            account_id.clone(),
            executor,
            tokens.clone(),
            settings.clone(),
            events,
        );
        Self {
            account_id,
            process,
            tokens,
            settings,
            lifecycle: Mutex::new(()),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.process.is_running()
    }

    /// Current action configs for registry snapshots.
    pub fn snapshot_state(&self) -> AccountState {
        AccountState::from_settings(self.account_id.clone(), &self.settings.read())
    }

    /// Merge a partial update into the named action and apply the
    /// resulting timer edge.
    ///
    /// Enable starts the loop, disable stops it, and any material
    /// change to an already-enabled action restarts it so the old
    /// schedule never fires again.
    pub async fn apply_patch(&self, patch: &ActionPatch) -> AutomationResult<()> {
        let _guard = self.lifecycle.lock().await;
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(AutomationError::NotFound(self.account_id.clone()));
        }

        let previous = self.settings.write().patch(patch)?;
        let current = match self.settings.read().get(patch.kind) {
            Some(config) => config.clone(),
            None => return Err(AutomationError::NotFound(self.account_id.clone())),
        };

        match (previous.enabled, current.enabled) {
            (false, true) => {
                debug!(account_id = %self.account_id, kind = %patch.kind, "Action enabled");
                self.process.start_action(current);
            }
            (true, false) => {
                debug!(account_id = %self.account_id, kind = %patch.kind, "Action disabled");
                self.process.stop_action(patch.kind);
            }
            (true, true) if previous != current => {
                debug!(
                    account_id = %self.account_id,
                    kind = %patch.kind,
                    interval_secs = current.interval_secs,
                    "Action reconfigured, restarting timer"
                );
                self.process.start_action(current);
            }
            _ => {}
        }
        Ok(())
    }

    /// Release everything this service owns, exactly once.
    ///
    /// Clears every interval, waits for in-flight ticks to wind down
    /// and drops cached tokens. Individual release failures are
    /// collected and returned; the sweep never stops early. Calling
    /// again is a no-op.
    pub async fn destroy(&self) -> Vec<ResourceReleaseError> {
        let _guard = self.lifecycle.lock().await;
        if self.destroyed.swap(true, Ordering::SeqCst) {
            debug!(account_id = %self.account_id, "Service already destroyed");
            return Vec::new();
        }

        let mut failures = Vec::new();
        let handles = self.process.clear_all();
        let stopped = handles.len();
        for handle in handles {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    failures.push(ResourceReleaseError::new(
                        self.account_id.clone(),
                        "action-loop",
                        err.to_string(),
                    ));
                }
            }
        }
        self.tokens.clear();

        debug!(
            account_id = %self.account_id,
            stopped,
            failures = failures.len(),
            "Service destroyed"
        );
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RetryPolicy;
    use serde_json::json;
    use std::time::Duration;
    use stw_client::{ApiOutcome, ScriptedApiClient, StaticTokenProvider};
    use stw_core::ActionKind;
    use tokio::sync::mpsc::Receiver;

    fn sample_service(account: &str) -> (AutomationService, Arc<ScriptedApiClient>, Receiver<AutomationEvent>) {
        let api = Arc::new(ScriptedApiClient::new());
        let mut provider = StaticTokenProvider::default();
        provider.insert(AccountId::from(account), "tok");
        let executor = Arc::new(ActionExecutor::new(
            Arc::new(provider),
            api.clone(),
            RetryPolicy::default(),
        ));
        let (tx, rx) = mpsc::channel(64);
        (
            AutomationService::new(AccountId::from(account), executor, tx),
            api,
            rx,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_service_starts_idle() {
        let (service, api, _rx) = sample_service("acct-1");
        assert!(!service.is_running());
        assert_eq!(service.snapshot_state().enabled_count(), 0);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_edge_starts_timer_and_disable_stops_it() {
        let (service, api, _rx) = sample_service("acct-1");
        api.set_default_outcome(Ok(ApiOutcome::Completed(json!({"ok": true}))));

        service
            .apply_patch(
                &ActionPatch::new(ActionKind::ClaimRewards)
                    .enable(true)
                    .interval_secs(60),
            )
            .await
            .unwrap();
        assert!(service.is_running());

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(api.call_count(), 1);

        service
            .apply_patch(&ActionPatch::new(ActionKind::ClaimRewards).enable(false))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(api.call_count(), 1);
        assert!(!service.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_params_only_patch_keeps_action_enabled() {
        let (service, _api, _rx) = sample_service("acct-1");
        service
            .apply_patch(
                &ActionPatch::new(ActionKind::MissionAlertWatch)
                    .enable(true)
                    .interval_secs(120),
            )
            .await
            .unwrap();

        service
            .apply_patch(
                &ActionPatch::new(ActionKind::MissionAlertWatch)
                    .params(json!({"zones": ["twine"]})),
            )
            .await
            .unwrap();

        assert!(service.is_running());
        let state = service.snapshot_state();
        let config = state
            .actions
            .iter()
            .find(|a| a.kind == ActionKind::MissionAlertWatch)
            .unwrap();
        assert!(config.enabled);
        assert_eq!(config.params, json!({"zones": ["twine"]}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_is_idempotent() {
        let (service, api, _rx) = sample_service("acct-1");
        service
            .apply_patch(
                &ActionPatch::new(ActionKind::ClaimRewards)
                    .enable(true)
                    .interval_secs(60),
            )
            .await
            .unwrap();

        assert!(service.destroy().await.is_empty());
        assert!(service.is_destroyed());
        assert!(!service.is_running());

        // Second destroy finds nothing to release.
        assert!(service.destroy().await.is_empty());

        // No tick ever fires again.
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_patch_after_destroy_is_not_found() {
        let (service, _api, _rx) = sample_service("acct-1");
        service.destroy().await;

        let err = service
            .apply_patch(&ActionPatch::new(ActionKind::ClaimRewards).enable(true))
            .await
            .unwrap_err();
        assert!(matches!(err, AutomationError::NotFound(_)));
        assert!(!service.is_running());
    }
}
