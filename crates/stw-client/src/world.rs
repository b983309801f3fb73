//! World state capability.
//!
//! The daily reset publishes a new world snapshot (missions, alerts,
//! theaters). A snapshot missing any of the three sections is treated
//! as not yet rolled over.

use crate::api::BoxFuture;
use crate::error::ClientResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// The daily world snapshot, payload shapes left opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default)]
    pub missions: Value,
    #[serde(rename = "missionAlerts", default)]
    pub mission_alerts: Value,
    #[serde(default)]
    pub theaters: Value,
    #[serde(skip, default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl WorldSnapshot {
    /// All three sections present and non-empty.
    pub fn is_populated(&self) -> bool {
        fn non_empty(section: &Value) -> bool {
            section.as_array().is_some_and(|a| !a.is_empty())
        }
        non_empty(&self.missions)
            && non_empty(&self.mission_alerts)
            && non_empty(&self.theaters)
    }
}

/// Fetches the current world snapshot.
pub trait WorldStateClient: Send + Sync {
    fn fetch_world_state(&self) -> BoxFuture<'_, ClientResult<WorldSnapshot>>;
}

/// Shared, dynamically-dispatched world state client.
pub type DynWorldStateClient = Arc<dyn WorldStateClient>;
