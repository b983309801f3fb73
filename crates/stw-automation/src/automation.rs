//! The automation orchestrator.
//!
//! Registry of every account's [`AutomationService`], keyed by account
//! id. Structural operations serialize per key; ticks themselves run
//! outside any registry lock, so one account's work never blocks
//! another's bookkeeping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use stw_core::{AccountId, ActionPatch, AutomationEvent, RegistrySnapshot};
use stw_telemetry::Metrics;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{AutomationError, AutomationResult, ResourceReleaseError};
use crate::executor::ActionExecutor;
use crate::service::AutomationService;

/// Registry and lifecycle manager for all per-account automation.
pub struct Automation {
    registry: DashMap<AccountId, Arc<AutomationService>>,
    executor: Arc<ActionExecutor>,
    events: mpsc::Sender<AutomationEvent>,
    terminated: AtomicBool,
}

impl Automation {
    pub fn new(executor: Arc<ActionExecutor>, events: mpsc::Sender<AutomationEvent>) -> Self {
        Self {
            registry: DashMap::new(),
            executor,
            events,
            terminated: AtomicBool::new(false),
        }
    }

    /// Snapshot of every registered account and its action configs.
    ///
    /// Pure read; safe to call concurrently with anything, including
    /// after shutdown (when it reports an empty registry).
    pub fn load(&self) -> RegistrySnapshot {
        RegistrySnapshot::new(
            self.registry
                .iter()
                .map(|entry| entry.value().snapshot_state())
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Register an account with every action disabled.
    ///
    /// Idempotent: a second add for the same id (including a racing
    /// concurrent one; insertion goes through the map's entry lock)
    /// leaves the existing service untouched.
    pub fn add_account(&self, account_id: AccountId) -> AutomationResult<RegistrySnapshot> {
        self.ensure_active()?;

        let mut inserted = false;
        self.registry.entry(account_id.clone()).or_insert_with(|| {
            inserted = true;
            Arc::new(AutomationService::new(
                account_id.clone(),
                self.executor.clone(),
                self.events.clone(),
            ))
        });

        if inserted {
            Metrics::account_added();
            info!(%account_id, "Account registered");
            self.notify(AutomationEvent::AccountAdded { account_id });
        } else {
            debug!(%account_id, "Account already registered");
        }
        Ok(self.load())
    }

    /// Unregister an account and release its resources.
    ///
    /// The entry leaves the registry before teardown starts, so no new
    /// tick can be dispatched to a service that is mid-destroy and a
    /// late `update_action` reads not-found. Release failures are
    /// logged without aborting the teardown.
    pub async fn remove_account(&self, account_id: &AccountId) -> AutomationResult<()> {
        self.ensure_active()?;

        let (_, service) = self
            .registry
            .remove(account_id)
            .ok_or_else(|| AutomationError::NotFound(account_id.clone()))?;

        for failure in service.destroy().await {
            warn!(%failure, "Resource release failed during removal");
        }
        Metrics::account_removed();
        info!(%account_id, "Account removed");
        self.notify(AutomationEvent::AccountRemoved {
            account_id: account_id.clone(),
        });
        Ok(())
    }

    /// Merge a partial config update into one of the account's actions.
    ///
    /// Timer edges (enable, disable, reconfigure) apply before the
    /// call returns with the updated registry snapshot.
    pub async fn update_action(
        &self,
        account_id: &AccountId,
        patch: &ActionPatch,
    ) -> AutomationResult<RegistrySnapshot> {
        self.ensure_active()?;

        // Clone the Arc out so no registry shard lock is held while
        // the patch (and any timer edge) applies.
        let service = self
            .registry
            .get(account_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AutomationError::NotFound(account_id.clone()))?;

        service.apply_patch(patch).await?;
        Ok(self.load())
    }

    /// Terminal teardown: destroy every registered service exactly
    /// once, aggregating release failures without stopping the sweep.
    ///
    /// Structural operations after this return `Terminated`.
    pub async fn shutdown(&self) -> Vec<ResourceReleaseError> {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return Vec::new();
        }

        let account_ids: Vec<AccountId> = self
            .registry
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        info!(accounts = account_ids.len(), "Automation shutting down");

        let mut failures = Vec::new();
        for account_id in account_ids {
            if let Some((_, service)) = self.registry.remove(&account_id) {
                failures.extend(service.destroy().await);
                Metrics::account_removed();
            }
        }

        for failure in &failures {
            warn!(%failure, "Resource release failed during shutdown");
        }
        info!(failures = failures.len(), "Automation shut down");
        failures
    }

    fn ensure_active(&self) -> AutomationResult<()> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(AutomationError::Terminated);
        }
        Ok(())
    }

    /// Best-effort event emission; a full or closed sink never
    /// propagates into registry management.
    fn notify(&self, event: AutomationEvent) {
        if let Err(err) = self.events.try_send(event) {
            warn!(%err, "Dropped automation event");
        }
    }
}
