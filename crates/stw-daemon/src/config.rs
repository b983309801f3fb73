//! Daemon configuration.

use crate::error::{DaemonError, DaemonResult};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use stw_automation::RetryPolicy;
use stw_client::HttpClientConfig;
use stw_core::{ActionKind, ActionPatch};
use stw_scheduler::DailyRule;

/// Executor retry/timeout configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum attempts per tick, first try included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for in-tick exponential backoff (ms).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Backoff cap (ms).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Bound on one interaction cycle (ms).
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_attempt_timeout_ms() -> u64 {
    10_000
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
        }
    }
}

impl From<&ExecutorConfig> for RetryPolicy {
    fn from(cfg: &ExecutorConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts,
            base_delay_ms: cfg.base_delay_ms,
            max_delay_ms: cfg.max_delay_ms,
            attempt_timeout_ms: cfg.attempt_timeout_ms,
        }
    }
}

/// Daily trigger instant, UTC.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    /// Shortly after midnight so the reset has landed service-side.
    #[serde(default = "default_schedule_second")]
    pub second: u32,
}

fn default_schedule_second() -> u32 {
    5
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: 0,
            minute: 0,
            second: default_schedule_second(),
        }
    }
}

impl ScheduleConfig {
    pub fn rule(&self) -> DaemonResult<DailyRule> {
        DailyRule::new(self.hour, self.minute, self.second).map_err(DaemonError::from)
    }
}

/// World snapshot fetch and archive configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorldConfig {
    /// Directory for dated snapshot files.
    #[serde(default = "default_world_data_dir")]
    pub data_dir: String,
    /// Account whose token fetches world info (not a player account).
    #[serde(default = "default_world_service_account")]
    pub service_account: String,
    /// Token for the service account.
    #[serde(default)]
    pub token: String,
}

fn default_world_data_dir() -> String {
    "./data/world".to_string()
}

fn default_world_service_account() -> String {
    "world-service".to_string()
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            data_dir: default_world_data_dir(),
            service_account: default_world_service_account(),
            token: String::new(),
        }
    }
}

/// One action to seed for an account at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionSeed {
    pub kind: ActionKind,
    /// Listing an action in config means running it.
    #[serde(default = "default_action_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub interval_secs: Option<u64>,
    #[serde(default)]
    pub params: Option<Value>,
}

fn default_action_enabled() -> bool {
    true
}

impl ActionSeed {
    pub fn to_patch(&self) -> ActionPatch {
        let mut patch = ActionPatch::new(self.kind).enable(self.enabled);
        if let Some(interval_secs) = self.interval_secs {
            patch = patch.interval_secs(interval_secs);
        }
        if let Some(ref params) = self.params {
            patch = patch.params(params.clone());
        }
        patch
    }
}

/// One automated account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub id: String,
    /// Operator-supplied long-lived token; rotation means a restart.
    pub token: String,
    #[serde(default)]
    pub actions: Vec<ActionSeed>,
}

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonConfig {
    /// External service endpoint.
    #[serde(default)]
    pub api: HttpClientConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub world: WorldConfig,
    /// Outbound event channel capacity.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

fn default_event_capacity() -> usize {
    1000
}

impl DaemonConfig {
    /// Load from a specific file.
    pub fn from_file(path: &str) -> DaemonResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| DaemonError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load from the path, or defaults if the file does not exist.
    pub fn load(path: &str) -> DaemonResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(%path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }
}
