//! Per-account interval loops.
//!
//! Each enabled action runs in its own task with its own cancellation
//! token, so one action's slow or failing tick never delays another's
//! schedule. Cancellation is cooperative: an in-flight tick finishes
//! (bounded by the executor timeout) and no new tick starts afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use stw_client::TokenCache;
use stw_core::{AccountId, ActionConfig, ActionKind, ActionSettings, AutomationEvent};
use stw_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::executor::ActionExecutor;

/// Handle for one running action loop.
struct ActionTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the interval timers for a single account.
///
/// Idle (no loops) while every action is disabled; Running once at
/// least one is enabled. Created when the account is added, torn down
/// by [`clear_all`](Self::clear_all) on removal or global shutdown.
pub struct AccountProcess {
    account_id: AccountId,
    executor: Arc<ActionExecutor>,
    tokens: Arc<TokenCache>,
    settings: Arc<RwLock<ActionSettings>>,
    events: mpsc::Sender<AutomationEvent>,
    tasks: Mutex<HashMap<ActionKind, ActionTask>>,
}

impl AccountProcess {
    pub fn new(
        account_id: AccountId,
        executor: Arc<ActionExecutor>,
        tokens: Arc<TokenCache>,
        settings: Arc<RwLock<ActionSettings>>,
        events: mpsc::Sender<AutomationEvent>,
    ) -> Self {
        Self {
            account_id,
            executor,
            tokens,
            settings,
            events,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Whether any action loop is currently live.
    pub fn is_running(&self) -> bool {
        self.tasks.lock().values().any(|t| !t.handle.is_finished())
    }

    /// Kinds with a live loop, sorted for stable assertions.
    pub fn active_actions(&self) -> Vec<ActionKind> {
        let mut kinds: Vec<ActionKind> = self
            .tasks
            .lock()
            .iter()
            .filter(|(_, t)| !t.handle.is_finished())
            .map(|(&kind, _)| kind)
            .collect();
        kinds.sort();
        kinds
    }

    /// Start (or restart) the interval loop for one enabled action.
    ///
    /// Any previous loop for the same kind is cancelled before the new
    /// one is spawned, so the old schedule never fires again and the
    /// first new tick lands one full interval from now.
    pub fn start_action(&self, config: ActionConfig) {
        if !config.enabled || !config.kind.is_recurring() {
            return;
        }
        let kind = config.kind;
        let mut tasks = self.tasks.lock();
        if let Some(previous) = tasks.remove(&kind) {
            previous.cancel.cancel();
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_action_loop(
            self.account_id.clone(),
            config,
            self.executor.clone(),
            self.tokens.clone(),
            self.settings.clone(),
            self.events.clone(),
            cancel.clone(),
        ));
        tasks.insert(kind, ActionTask { cancel, handle });
    }

    /// Stop the loop for one action, returning its handle for joining.
    pub fn stop_action(&self, kind: ActionKind) -> Option<JoinHandle<()>> {
        let task = self.tasks.lock().remove(&kind)?;
        task.cancel.cancel();
        debug!(account_id = %self.account_id, %kind, "Action loop cancelled");
        Some(task.handle)
    }

    /// Cancel every active loop, however many actions are enabled.
    ///
    /// Safe to call any number of times; later calls find nothing to
    /// clear. Returned handles let the caller wait for in-flight ticks.
    pub fn clear_all(&self) -> Vec<JoinHandle<()>> {
        let tasks: Vec<ActionTask> = {
            let mut guard = self.tasks.lock();
            guard.drain().map(|(_, task)| task).collect()
        };
        if !tasks.is_empty() {
            debug!(account_id = %self.account_id, count = tasks.len(), "Clearing action loops");
        }
        tasks
            .into_iter()
            .map(|task| {
                task.cancel.cancel();
                task.handle
            })
            .collect()
    }
}

/// One action's tick loop.
///
/// Fires on a fixed cadence starting one interval after enable. A tick
/// that overruns its slot delays the next fire rather than bursting to
/// catch up. A fatal result disables this action only and ends the loop.
async fn run_action_loop(
    account_id: AccountId,
    config: ActionConfig,
    executor: Arc<ActionExecutor>,
    tokens: Arc<TokenCache>,
    settings: Arc<RwLock<ActionSettings>>,
    events: mpsc::Sender<AutomationEvent>,
    cancel: CancellationToken,
) {
    let period = config.interval();
    let kind = config.kind;
    debug!(%account_id, %kind, period_secs = period.as_secs(), "Action loop started");

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = executor
            .execute(account_id.clone(), &config, &tokens)
            .await;
        let fatal = result.status.is_fatal();
        let detail = result.detail.clone();

        if events.send(AutomationEvent::Action(result)).await.is_err() {
            warn!(%account_id, %kind, "Event receiver dropped, stopping action loop");
            break;
        }

        if fatal {
            settings.write().disable(kind);
            Metrics::action_disabled(kind.as_str());
            warn!(%account_id, %kind, "Action disabled after fatal tick, re-authentication required");
            let disabled = AutomationEvent::ActionDisabled {
                account_id: account_id.clone(),
                kind,
                reason: detail.unwrap_or_else(|| "fatal failure".to_string()),
            };
            if events.send(disabled).await.is_err() {
                warn!(%account_id, %kind, "Event receiver dropped");
            }
            break;
        }
    }

    debug!(%account_id, %kind, "Action loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RetryPolicy;
    use serde_json::json;
    use std::time::Duration;
    use stw_client::{ApiOutcome, ClientError, ScriptedApiClient, StaticTokenProvider};
    use stw_core::{ActionPatch, ActionStatus};
    use tokio::sync::mpsc::Receiver;

    struct Harness {
        process: AccountProcess,
        settings: Arc<RwLock<ActionSettings>>,
        api: Arc<ScriptedApiClient>,
        rx: Receiver<AutomationEvent>,
    }

    fn sample_process(account: &str) -> Harness {
        let api = Arc::new(ScriptedApiClient::new());
        let mut provider = StaticTokenProvider::default();
        provider.insert(AccountId::from(account), "tok");
        let executor = Arc::new(ActionExecutor::new(
            Arc::new(provider),
            api.clone(),
            RetryPolicy::default(),
        ));
        let settings = Arc::new(RwLock::new(ActionSettings::default_disabled()));
        let (tx, rx) = mpsc::channel(64);
        let process = AccountProcess::new(
            AccountId::from(account),
            executor,
            Arc::new(TokenCache::new()),
            settings.clone(),
            tx,
        );
        Harness {
            process,
            settings,
            api,
            rx,
        }
    }

    fn enabled_config(kind: ActionKind, interval_secs: u64) -> ActionConfig {
        let mut settings = ActionSettings::default_disabled();
        settings
            .patch(
                &ActionPatch::new(kind)
                    .enable(true)
                    .interval_secs(interval_secs),
            )
            .unwrap();
        settings.get(kind).cloned().unwrap()
    }

    fn drain_action_events(rx: &mut Receiver<AutomationEvent>) -> Vec<ActionStatus> {
        let mut statuses = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AutomationEvent::Action(result) = event {
                statuses.push(result.status);
            }
        }
        statuses
    }

    #[tokio::test(start_paused = true)]
    async fn test_enabled_action_ticks_once_per_interval() {
        let mut harness = sample_process("acct-1");
        harness
            .api
            .set_default_outcome(Ok(ApiOutcome::Completed(json!({"claimed": 1}))));

        harness
            .process
            .start_action(enabled_config(ActionKind::ClaimRewards, 60));
        assert!(harness.process.is_running());

        // Three full periods, no tick at t=0.
        tokio::time::sleep(Duration::from_secs(185)).await;

        let statuses = drain_action_events(&mut harness.rx);
        assert_eq!(statuses.len(), 3);
        assert!(statuses.iter().all(|s| *s == ActionStatus::Success));
        assert_eq!(harness.api.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_action_silences_the_timer() {
        let mut harness = sample_process("acct-1");
        harness
            .process
            .start_action(enabled_config(ActionKind::ClaimRewards, 60));

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(drain_action_events(&mut harness.rx).len(), 1);

        harness.process.stop_action(ActionKind::ClaimRewards);
        tokio::time::sleep(Duration::from_secs(300)).await;

        assert!(drain_action_events(&mut harness.rx).is_empty());
        assert!(!harness.process.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_reschedules_without_double_fire() {
        let mut harness = sample_process("acct-1");
        harness
            .process
            .start_action(enabled_config(ActionKind::ClaimRewards, 60));

        // Restart with a longer period just before the first fire.
        tokio::time::sleep(Duration::from_secs(50)).await;
        harness
            .process
            .start_action(enabled_config(ActionKind::ClaimRewards, 300));

        // The old 60s schedule must not fire at t=60.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(drain_action_events(&mut harness.rx).is_empty());

        // The new period elapses at t=50+300.
        tokio::time::sleep(Duration::from_secs(245)).await;
        assert_eq!(drain_action_events(&mut harness.rx).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_actions_tick_independently() {
        let mut harness = sample_process("acct-1");
        // Every call stalls until the 10s attempt timeout, so one tick
        // burns ~31s in retries before reporting a transient failure.
        harness.api.set_delay(Duration::from_secs(3600));
        harness
            .process
            .start_action(enabled_config(ActionKind::ClaimRewards, 60));
        harness
            .process
            .start_action(enabled_config(ActionKind::XpBoostConsume, 60));

        tokio::time::sleep(Duration::from_secs(250)).await;

        // Slow ticks push back their own loop's next fire, but each
        // loop keeps its own cadence: ticks complete at ~91s, ~151s
        // and ~211s for both actions.
        let mut per_kind: HashMap<ActionKind, usize> = HashMap::new();
        while let Ok(event) = harness.rx.try_recv() {
            if let AutomationEvent::Action(result) = event {
                assert_eq!(result.status, ActionStatus::TransientFailure);
                *per_kind.entry(result.kind).or_default() += 1;
            }
        }
        assert_eq!(per_kind.get(&ActionKind::ClaimRewards), Some(&3));
        assert_eq!(per_kind.get(&ActionKind::XpBoostConsume), Some(&3));
        assert_eq!(
            harness.process.active_actions(),
            vec![ActionKind::ClaimRewards, ActionKind::XpBoostConsume]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_tick_disables_only_that_action() {
        let mut harness = sample_process("acct-1");
        harness
            .api
            .push_outcome(Err(ClientError::Unauthorized("expired".into())));
        harness
            .api
            .set_default_outcome(Ok(ApiOutcome::Nothing));

        // claim-rewards fires first (60s) and consumes the scripted
        // fatal response; xp-boost-consume follows at 90s.
        harness.settings.write().patch(
            &ActionPatch::new(ActionKind::ClaimRewards).enable(true).interval_secs(60),
        ).unwrap();
        harness.settings.write().patch(
            &ActionPatch::new(ActionKind::XpBoostConsume).enable(true).interval_secs(90),
        ).unwrap();
        harness
            .process
            .start_action(harness.settings.read().get(ActionKind::ClaimRewards).cloned().unwrap());
        harness
            .process
            .start_action(harness.settings.read().get(ActionKind::XpBoostConsume).cloned().unwrap());

        tokio::time::sleep(Duration::from_secs(125)).await;

        // claim-rewards hit the fatal tick first and flipped itself off.
        assert!(!harness.settings.read().get(ActionKind::ClaimRewards).unwrap().enabled);
        assert!(harness.settings.read().get(ActionKind::XpBoostConsume).unwrap().enabled);
        assert_eq!(harness.process.active_actions(), vec![ActionKind::XpBoostConsume]);

        let mut saw_disabled = false;
        let mut fatal_count = 0;
        while let Ok(event) = harness.rx.try_recv() {
            match event {
                AutomationEvent::ActionDisabled { kind, .. } => {
                    assert_eq!(kind, ActionKind::ClaimRewards);
                    saw_disabled = true;
                }
                AutomationEvent::Action(result) if result.status.is_fatal() => {
                    assert_eq!(result.kind, ActionKind::ClaimRewards);
                    fatal_count += 1;
                }
                _ => {}
            }
        }
        assert!(saw_disabled);
        assert_eq!(fatal_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all_is_idempotent_and_total() {
        let harness = sample_process("acct-1");
        harness
            .process
            .start_action(enabled_config(ActionKind::ClaimRewards, 60));
        harness
            .process
            .start_action(enabled_config(ActionKind::MissionAlertWatch, 120));

        let handles = harness.process.clear_all();
        assert_eq!(handles.len(), 2);
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(!harness.process.is_running());

        // Second clear finds nothing.
        assert!(harness.process.clear_all().is_empty());
    }
}
