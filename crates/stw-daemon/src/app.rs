//! Main application wiring.
//!
//! Builds the capability clients, the orchestrator and the global
//! scheduler from configuration, seeds the configured accounts, then
//! drives the event loop until ctrl-c. The daily refresh signal fans
//! out here: world-state refresh plus a bulk anti-cheat pass over the
//! loaded accounts.

use std::sync::Arc;

use stw_automation::{ActionExecutor, Automation, RetryPolicy};
use stw_client::{
    DynApiClient, DynAuthProvider, DynWorldStateClient, HttpApiClient, HttpWorldClient,
    StaticTokenProvider, TokenCache,
};
use stw_core::{AccountId, ActionConfig, ActionKind, ActionStatus, AutomationEvent};
use stw_scheduler::GlobalScheduler;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;
use crate::error::DaemonResult;
use crate::world_archive::WorldArchive;

/// Main application.
pub struct Application {
    config: DaemonConfig,
}

impl Application {
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        Ok(Self { config })
    }

    /// Run until ctrl-c, then tear down: orchestrator sweep first,
    /// then the scheduler's graceful stop.
    pub async fn run(self) -> DaemonResult<()> {
        let mut provider = StaticTokenProvider::default();
        for account in &self.config.accounts {
            provider.insert(AccountId::from(account.id.as_str()), account.token.clone());
        }
        let service_account = AccountId::from(self.config.world.service_account.as_str());
        if !self.config.world.token.is_empty() {
            provider.insert(service_account.clone(), self.config.world.token.clone());
        }
        let auth: DynAuthProvider = Arc::new(provider);
        let api: DynApiClient = Arc::new(HttpApiClient::new(self.config.api.clone())?);
        let world: DynWorldStateClient = Arc::new(HttpWorldClient::new(
            self.config.api.clone(),
            auth.clone(),
            service_account,
        )?);

        let (event_tx, mut event_rx) = mpsc::channel(self.config.event_capacity);

        let executor = Arc::new(ActionExecutor::new(
            auth.clone(),
            api.clone(),
            RetryPolicy::from(&self.config.executor),
        ));
        let automation = Arc::new(Automation::new(executor.clone(), event_tx.clone()));

        let scheduler = GlobalScheduler::new(self.config.schedule.rule()?, event_tx.clone());
        scheduler.start()?;
        info!(rule = %scheduler.rule(), "Daily schedule armed");

        self.seed_accounts(&automation).await?;

        let archive = WorldArchive::new(&self.config.world.data_dir);
        // The daily one-shot checks reuse tokens across accounts but
        // outlive no single service, so they keep their own cache.
        let daily_tokens = Arc::new(TokenCache::new());

        info!("Entering main event loop");
        loop {
            tokio::select! {
                Some(event) = event_rx.recv() => {
                    handle_event(
                        event,
                        &automation,
                        &executor,
                        &world,
                        &archive,
                        &daily_tokens,
                        &event_tx,
                    );
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        let failures = automation.shutdown().await;
        if !failures.is_empty() {
            warn!(count = failures.len(), "Some resources failed to release");
        }
        scheduler.shutdown().await;
        info!("Daemon stopped");
        Ok(())
    }

    async fn seed_accounts(&self, automation: &Automation) -> DaemonResult<()> {
        for account in &self.config.accounts {
            let id = AccountId::from(account.id.as_str());
            automation.add_account(id.clone())?;
            for seed in &account.actions {
                automation.update_action(&id, &seed.to_patch()).await?;
            }
        }
        info!(accounts = self.config.accounts.len(), "Automation seeded");
        Ok(())
    }
}

/// Route one event: results go to the log (the notification sink
/// here), the daily signal spawns the fan-out task.
fn handle_event(
    event: AutomationEvent,
    automation: &Arc<Automation>,
    executor: &Arc<ActionExecutor>,
    world: &DynWorldStateClient,
    archive: &WorldArchive,
    daily_tokens: &Arc<TokenCache>,
    events: &mpsc::Sender<AutomationEvent>,
) {
    match event {
        AutomationEvent::Action(result) => match result.status {
            ActionStatus::Success => {
                info!(
                    account_id = %result.account_id,
                    kind = %result.kind,
                    tick_id = %result.tick_id,
                    "Action completed"
                );
            }
            ActionStatus::Empty => {
                debug!(account_id = %result.account_id, kind = %result.kind, "Nothing to do");
            }
            ActionStatus::TransientFailure | ActionStatus::FatalFailure => {
                warn!(
                    account_id = %result.account_id,
                    kind = %result.kind,
                    status = %result.status,
                    detail = result.detail.as_deref().unwrap_or(""),
                    "Action tick failed"
                );
            }
        },
        AutomationEvent::ActionDisabled {
            account_id,
            kind,
            reason,
        } => {
            warn!(%account_id, %kind, %reason, "Action disabled, re-authentication required");
        }
        AutomationEvent::AccountAdded { account_id } => {
            debug!(%account_id, "Account added");
        }
        AutomationEvent::AccountRemoved { account_id } => {
            debug!(%account_id, "Account removed");
        }
        AutomationEvent::DailyRefresh { fired_at } => {
            info!(%fired_at, "Daily refresh signal received");
            tokio::spawn(daily_fan_out(
                automation.clone(),
                executor.clone(),
                world.clone(),
                archive.clone(),
                daily_tokens.clone(),
                events.clone(),
            ));
        }
    }
}

/// The daily reset work: refresh and archive the world snapshot, then
/// run a one-shot anti-cheat check for every loaded account.
///
/// Runs off the event loop; per-account interval timers are untouched.
async fn daily_fan_out(
    automation: Arc<Automation>,
    executor: Arc<ActionExecutor>,
    world: DynWorldStateClient,
    archive: WorldArchive,
    tokens: Arc<TokenCache>,
    events: mpsc::Sender<AutomationEvent>,
) {
    refresh_world_state(&world, &archive).await;

    let snapshot = automation.load();
    info!(accounts = snapshot.len(), "Running bulk anti-cheat check");
    let config = ActionConfig::one_shot(ActionKind::AntiCheatCheck);
    for account in snapshot.accounts {
        let result = executor
            .execute(account.account_id, &config, &tokens)
            .await;
        if events.send(AutomationEvent::Action(result)).await.is_err() {
            warn!("Event receiver dropped during daily fan-out");
            return;
        }
    }
}

async fn refresh_world_state(world: &DynWorldStateClient, archive: &WorldArchive) {
    match world.fetch_world_state().await {
        Ok(snapshot) if snapshot.is_populated() => {
            if let Err(err) = archive.save(&snapshot) {
                warn!(%err, "Failed to archive world snapshot");
            }
        }
        Ok(_) => {
            // Missions, alerts and theaters all have to be present;
            // otherwise the reset has not landed service-side yet.
            warn!("World snapshot not populated, skipping archive");
        }
        Err(err) => {
            warn!(%err, "World state refresh failed");
        }
    }
}
