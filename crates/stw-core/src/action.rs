//! Automation action definitions.
//!
//! An action is a named automation behavior with its own enable flag,
//! interval and free-form parameters. Accounts start with every recurring
//! action present but disabled; the operator enables them individually.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default tick interval for newly created action configs (6 minutes,
/// roughly one mission cycle).
pub const DEFAULT_INTERVAL_SECS: u64 = 360;

/// Named automation behaviors understood by the executor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// Claim pending mission rewards for the account.
    ClaimRewards,
    /// Watch the current mission alert rotation for configured targets.
    MissionAlertWatch,
    /// Consume queued XP boosts.
    XpBoostConsume,
    /// One-shot anti-cheat provider check; never runs on an interval.
    AntiCheatCheck,
}

impl ActionKind {
    /// Kinds that run on a per-account interval loop.
    pub const RECURRING: [ActionKind; 3] = [
        ActionKind::ClaimRewards,
        ActionKind::MissionAlertWatch,
        ActionKind::XpBoostConsume,
    ];

    /// Canonical kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::ClaimRewards => "claim-rewards",
            ActionKind::MissionAlertWatch => "mission-alert-watch",
            ActionKind::XpBoostConsume => "xp-boost-consume",
            ActionKind::AntiCheatCheck => "anti-cheat-check",
        }
    }

    /// Whether this kind is driven by an interval timer.
    pub fn is_recurring(&self) -> bool {
        !matches!(self, ActionKind::AntiCheatCheck)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "claim-rewards" => Ok(ActionKind::ClaimRewards),
            "mission-alert-watch" => Ok(ActionKind::MissionAlertWatch),
            "xp-boost-consume" => Ok(ActionKind::XpBoostConsume),
            "anti-cheat-check" => Ok(ActionKind::AntiCheatCheck),
            other => Err(CoreError::UnknownAction(other.to_string())),
        }
    }
}

impl Default for ActionKind {
    fn default() -> Self {
        ActionKind::ClaimRewards
    }
}

/// Configuration for a single action on a single account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub kind: ActionKind,
    /// Whether the interval loop for this action is running.
    #[serde(default)]
    pub enabled: bool,
    /// Tick period in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Free-form action parameters, passed to the API untouched.
    #[serde(default)]
    pub params: Value,
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}

impl ActionConfig {
    /// Create a disabled config with the default interval.
    pub fn disabled(kind: ActionKind) -> Self {
        Self {
            kind,
            enabled: false,
            interval_secs: DEFAULT_INTERVAL_SECS,
            params: Value::Null,
        }
    }

    /// Create a config for a single immediate execution (daily fan-out).
    pub fn one_shot(kind: ActionKind) -> Self {
        Self {
            kind,
            enabled: true,
            interval_secs: DEFAULT_INTERVAL_SECS,
            params: Value::Null,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Merge a partial update into this config.
    ///
    /// Absent patch fields leave the current value untouched. Object
    /// params merge key-by-key; any other shape replaces wholesale.
    pub fn apply(&mut self, patch: &ActionPatch) -> Result<()> {
        if let Some(interval_secs) = patch.interval_secs {
            if interval_secs == 0 {
                return Err(CoreError::InvalidInterval(interval_secs));
            }
            self.interval_secs = interval_secs;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(ref params) = patch.params {
            match (&mut self.params, params) {
                (Value::Object(current), Value::Object(incoming)) => {
                    for (key, value) in incoming {
                        current.insert(key.clone(), value.clone());
                    }
                }
                (current, incoming) => *current = incoming.clone(),
            }
        }
        Ok(())
    }
}

/// Partial update for one action's config, as submitted by the operator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionPatch {
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl ActionPatch {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            enabled: None,
            interval_secs: None,
            params: None,
        }
    }

    pub fn enable(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = Some(secs);
        self
    }

    pub fn params(mut self, params: Value) -> Self {
        self.params = Some(params);
        self
    }
}

/// The full action set for one account.
///
/// Every recurring kind is always present; one-shot kinds never are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSettings {
    actions: BTreeMap<ActionKind, ActionConfig>,
}

impl ActionSettings {
    /// The default set a freshly added account gets: all recurring
    /// actions present, none enabled.
    pub fn default_disabled() -> Self {
        let actions = ActionKind::RECURRING
            .iter()
            .map(|&kind| (kind, ActionConfig::disabled(kind)))
            .collect();
        Self { actions }
    }

    pub fn get(&self, kind: ActionKind) -> Option<&ActionConfig> {
        self.actions.get(&kind)
    }

    /// Apply a patch to the named action.
    ///
    /// Returns the config as it was before the merge, for edge detection.
    pub fn patch(&mut self, patch: &ActionPatch) -> Result<ActionConfig> {
        if !patch.kind.is_recurring() {
            return Err(CoreError::InvalidConfig(format!(
                "{} is one-shot and cannot be scheduled",
                patch.kind
            )));
        }
        let config = self
            .actions
            .get_mut(&patch.kind)
            .ok_or_else(|| CoreError::UnknownAction(patch.kind.to_string()))?;
        let previous = config.clone();
        config.apply(patch)?;
        Ok(previous)
    }

    /// Force-disable one action (fatal tick path).
    pub fn disable(&mut self, kind: ActionKind) {
        if let Some(config) = self.actions.get_mut(&kind) {
            config.enabled = false;
        }
    }

    pub fn enabled_kinds(&self) -> Vec<ActionKind> {
        self.actions
            .values()
            .filter(|c| c.enabled)
            .map(|c| c.kind)
            .collect()
    }

    pub fn configs(&self) -> impl Iterator<Item = &ActionConfig> {
        self.actions.values()
    }

    pub fn enabled_count(&self) -> usize {
        self.actions.values().filter(|c| c.enabled).count()
    }
}

impl Default for ActionSettings {
    fn default() -> Self {
        Self::default_disabled()
    }
}
