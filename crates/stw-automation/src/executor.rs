//! Single-tick action execution.
//!
//! One invocation is one tick: acquire a token, call the external API,
//! retry transient failures with exponential backoff, and classify the
//! outcome. All retry state lives and dies inside the call; the next
//! scheduled tick starts with a fresh budget.

use std::time::Duration;

use stw_client::{ApiOutcome, ClientError, ClientResult, DynApiClient, DynAuthProvider, TokenCache};
use stw_core::{AccountId, ActionConfig, ActionResult, TickId};
use stw_telemetry::Metrics;
use tracing::{debug, warn};

/// Retry policy applied within a single tick.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts per tick, first try included.
    pub max_attempts: u32,
    /// Base delay for exponential backoff.
    pub base_delay_ms: u64,
    /// Maximum backoff delay.
    pub max_delay_ms: u64,
    /// Bound on one full interaction cycle (auth + API call).
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 5_000,
            attempt_timeout_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff: base * 2^(attempt-1), capped at max.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        let delay = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// Executes one automation action for one account against the external API.
///
/// Stateless across ticks; shared by every account process.
pub struct ActionExecutor {
    auth: DynAuthProvider,
    api: DynApiClient,
    policy: RetryPolicy,
}

impl ActionExecutor {
    pub fn new(auth: DynAuthProvider, api: DynApiClient, policy: RetryPolicy) -> Self {
        Self { auth, api, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run exactly one tick of `config.kind` for `account`.
    ///
    /// Never returns an error: every outcome, including exhausted
    /// retries and fatal auth failures, is folded into the returned
    /// `ActionResult`.
    pub async fn execute(
        &self,
        account: AccountId,
        config: &ActionConfig,
        tokens: &TokenCache,
    ) -> ActionResult {
        let tick_id = TickId::new();
        let kind = config.kind;
        let mut attempt = 0u32;

        let result = loop {
            attempt += 1;
            match self.attempt(&account, config, tokens).await {
                Ok(ApiOutcome::Completed(payload)) => {
                    break ActionResult::success(tick_id, account, kind, payload);
                }
                Ok(ApiOutcome::Nothing) => {
                    break ActionResult::empty(tick_id, account, kind);
                }
                Err(err) if err.is_fatal_auth() => {
                    // A rejected token is useless for the next tick too.
                    tokens.invalidate(&account);
                    warn!(%account, %kind, error = %err, "Fatal auth failure");
                    break ActionResult::fatal(tick_id, account, kind, err.to_string());
                }
                Err(err) if err.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff_delay(attempt);
                    warn!(
                        %account,
                        %kind,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, backing off"
                    );
                    Metrics::tick_retry(kind.as_str());
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    break ActionResult::transient(tick_id, account, kind, err.to_string());
                }
            }
        };

        debug!(
            tick_id = %result.tick_id,
            account = %result.account_id,
            %kind,
            status = %result.status,
            attempts = attempt,
            "Tick completed"
        );
        Metrics::tick_completed(kind.as_str(), result.status.as_str());
        result
    }

    /// One bounded interaction cycle: cached token or fresh auth, then
    /// the API call. Exceeding the bound yields `Timeout` (transient).
    async fn attempt(
        &self,
        account: &AccountId,
        config: &ActionConfig,
        tokens: &TokenCache,
    ) -> ClientResult<ApiOutcome> {
        let cycle = async {
            let token = match tokens.get(account) {
                Some(token) => token,
                None => {
                    let token = self.auth.access_token(account.clone()).await?;
                    tokens.put(account.clone(), token.clone());
                    token
                }
            };
            self.api
                .perform_action(account.clone(), config.kind, config.params.clone(), token)
                .await
        };

        match tokio::time::timeout(self.policy.attempt_timeout(), cycle).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;
    use stw_client::{ScriptedApiClient, StaticTokenProvider};
    use stw_core::{ActionKind, ActionStatus};

    fn sample_executor(
        api: Arc<ScriptedApiClient>,
        policy: RetryPolicy,
    ) -> (ActionExecutor, TokenCache) {
        let mut tokens = HashMap::new();
        tokens.insert(AccountId::from("acct-1"), "tok".to_string());
        let auth = Arc::new(StaticTokenProvider::new(tokens));
        (ActionExecutor::new(auth, api, policy), TokenCache::new())
    }

    fn sample_config() -> ActionConfig {
        ActionConfig::one_shot(ActionKind::ClaimRewards)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let api = Arc::new(ScriptedApiClient::new());
        api.push_outcome(Ok(ApiOutcome::Completed(json!({"claimed": 2}))));
        let (executor, cache) = sample_executor(api.clone(), RetryPolicy::default());

        let result = executor
            .execute(AccountId::from("acct-1"), &sample_config(), &cache)
            .await;

        assert_eq!(result.status, ActionStatus::Success);
        assert_eq!(result.payload, Some(json!({"claimed": 2})));
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_outcome_is_not_a_failure() {
        let api = Arc::new(ScriptedApiClient::new());
        let (executor, cache) = sample_executor(api.clone(), RetryPolicy::default());

        let result = executor
            .execute(AccountId::from("acct-1"), &sample_config(), &cache)
            .await;

        assert_eq!(result.status, ActionStatus::Empty);
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retry_within_tick() {
        let api = Arc::new(ScriptedApiClient::new());
        api.push_outcome(Err(ClientError::Network("reset".into())));
        api.push_outcome(Err(ClientError::RateLimited {
            retry_after_secs: Some(1),
        }));
        api.push_outcome(Ok(ApiOutcome::Completed(json!({"ok": true}))));
        let (executor, cache) = sample_executor(api.clone(), RetryPolicy::default());

        let result = executor
            .execute(AccountId::from("acct-1"), &sample_config(), &cache)
            .await;

        assert_eq!(result.status, ActionStatus::Success);
        assert_eq!(api.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_yield_one_transient_result() {
        let api = Arc::new(ScriptedApiClient::new());
        api.set_default_outcome(Err(ClientError::Timeout));
        let policy = RetryPolicy {
            max_attempts: 3,
            ..Default::default()
        };
        let (executor, cache) = sample_executor(api.clone(), policy);

        let result = executor
            .execute(AccountId::from("acct-1"), &sample_config(), &cache)
            .await;

        assert_eq!(result.status, ActionStatus::TransientFailure);
        assert_eq!(api.call_count(), 3);

        // The next tick starts with a fresh budget.
        api.push_outcome(Ok(ApiOutcome::Completed(json!({"ok": true}))));
        let next = executor
            .execute(AccountId::from("acct-1"), &sample_config(), &cache)
            .await;
        assert_eq!(next.status, ActionStatus::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_auth_is_not_retried_and_drops_cached_token() {
        let api = Arc::new(ScriptedApiClient::new());
        api.set_default_outcome(Err(ClientError::Unauthorized("expired".into())));
        let (executor, cache) = sample_executor(api.clone(), RetryPolicy::default());

        let account = AccountId::from("acct-1");
        let result = executor.execute(account.clone(), &sample_config(), &cache).await;

        assert_eq!(result.status, ActionStatus::FatalFailure);
        assert_eq!(result.detail.as_deref(), Some("Unauthorized: expired"));
        assert_eq!(api.call_count(), 1);
        assert!(cache.get(&account).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_is_fatal() {
        let api = Arc::new(ScriptedApiClient::new());
        let (executor, cache) = sample_executor(api.clone(), RetryPolicy::default());

        let result = executor
            .execute(AccountId::from("acct-unknown"), &sample_config(), &cache)
            .await;

        assert_eq!(result.status, ActionStatus::FatalFailure);
        // The API was never reached.
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_call_times_out_as_transient() {
        let api = Arc::new(ScriptedApiClient::new());
        api.set_delay(Duration::from_secs(60));
        let policy = RetryPolicy {
            max_attempts: 2,
            attempt_timeout_ms: 1_000,
            ..Default::default()
        };
        let (executor, cache) = sample_executor(api.clone(), policy);

        let result = executor
            .execute(AccountId::from("acct-1"), &sample_config(), &cache)
            .await;

        assert_eq!(result.status, ActionStatus::TransientFailure);
        assert_eq!(api.call_count(), 2);
    }

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            base_delay_ms: 500,
            max_delay_ms: 5_000,
            ..Default::default()
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(1_000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(2_000));
        assert_eq!(policy.backoff_delay(10), Duration::from_millis(5_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_is_cached_across_ticks() {
        let api = Arc::new(ScriptedApiClient::new());
        let (executor, cache) = sample_executor(api.clone(), RetryPolicy::default());
        let account = AccountId::from("acct-1");

        executor.execute(account.clone(), &sample_config(), &cache).await;
        assert!(cache.get(&account).is_some());

        executor.execute(account.clone(), &sample_config(), &cache).await;
        assert_eq!(cache.len(), 1);
    }
}
