//! Process-wide daily trigger.
//!
//! One timer for the whole process, orthogonal to the per-account
//! loops. On fire it emits a `DailyRefresh` event; the external caller
//! fans that out to whichever accounts it currently has loaded. It
//! never iterates the automation registry itself.

use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use stw_core::AutomationEvent;
use stw_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{SchedulerError, SchedulerResult};
use crate::rule::DailyRule;

/// The single global daily scheduler.
///
/// Created at startup, torn down at shutdown, never recreated mid-run.
pub struct GlobalScheduler {
    rule: DailyRule,
    events: mpsc::Sender<AutomationEvent>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl GlobalScheduler {
    pub fn new(rule: DailyRule, events: mpsc::Sender<AutomationEvent>) -> Self {
        Self {
            rule,
            events,
            cancel: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    pub fn rule(&self) -> DailyRule {
        self.rule
    }

    /// Spawn the schedule loop. Errors if already started.
    pub fn start(&self) -> SchedulerResult<()> {
        let mut guard = self.handle.lock();
        if guard.is_some() {
            return Err(SchedulerError::AlreadyStarted);
        }
        *guard = Some(tokio::spawn(run_schedule_loop(
            self.rule,
            self.events.clone(),
            self.cancel.clone(),
        )));
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Graceful shutdown: schedule no further fires and wait for any
    /// fire in progress to complete before returning. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            info!("Waiting for daily schedule to stop");
            if let Err(err) = handle.await {
                if err.is_panic() {
                    error!(%err, "Daily schedule task panicked");
                }
            }
        }
    }
}

/// Sleep until the next rule instant, fire, repeat.
///
/// Cancellation is only observed while sleeping; a fire that has begun
/// always completes, which is what `shutdown` joins on.
async fn run_schedule_loop(
    rule: DailyRule,
    events: mpsc::Sender<AutomationEvent>,
    cancel: CancellationToken,
) {
    info!(%rule, "Daily schedule started");

    loop {
        let now = Utc::now();
        let next = rule.next_occurrence(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        debug!(next = %next, wait_secs = wait.as_secs(), "Sleeping until next daily fire");

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(wait) => {}
        }

        let fired_at = Utc::now();
        info!(%fired_at, "Daily reset fired");
        Metrics::scheduler_fired();
        if events
            .send(AutomationEvent::DailyRefresh { fired_at })
            .await
            .is_err()
        {
            warn!("Event receiver dropped, stopping daily schedule");
            break;
        }
    }

    info!("Daily schedule stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_fires_and_shuts_down() {
        let (tx, mut rx) = mpsc::channel(8);
        let scheduler = GlobalScheduler::new(DailyRule::DEFAULT_RESET, tx);
        scheduler.start().unwrap();
        assert!(scheduler.is_running());

        // The paused clock fast-forwards through the sleep; at least
        // one fire lands.
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AutomationEvent::DailyRefresh { .. }));

        scheduler.shutdown().await;
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_rejected() {
        let (tx, _rx) = mpsc::channel(8);
        let scheduler = GlobalScheduler::new(DailyRule::DEFAULT_RESET, tx);
        scheduler.start().unwrap();
        assert!(matches!(
            scheduler.start(),
            Err(SchedulerError::AlreadyStarted)
        ));
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_without_start_and_twice() {
        let (tx, _rx) = mpsc::channel(8);
        let scheduler = GlobalScheduler::new(DailyRule::DEFAULT_RESET, tx);
        scheduler.shutdown().await;
        scheduler.shutdown().await;
        assert!(!scheduler.is_running());
        // A cancelled scheduler never starts again in-run; the token
        // is already tripped so the loop exits on first poll.
        scheduler.start().unwrap();
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_receiver_stops_the_loop() {
        let (tx, rx) = mpsc::channel(8);
        let scheduler = GlobalScheduler::new(DailyRule::DEFAULT_RESET, tx);
        drop(rx);
        scheduler.start().unwrap();

        // First fire hits the closed channel and the loop winds down.
        tokio::time::sleep(Duration::from_secs(60 * 60 * 25)).await;
        assert!(!scheduler.is_running());
        scheduler.shutdown().await;
    }
}
