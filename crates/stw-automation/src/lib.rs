//! Account automation orchestrator for the STW automation pilot.
//!
//! Owns a dynamic set of independent per-account processes, each
//! running one interval loop per enabled action:
//! - `ActionExecutor`: one tick against the external API with timeout,
//!   in-tick retry and fatal classification
//! - `AccountProcess`: the per-account timers, cancellable and
//!   logically independent
//! - `AutomationService`: process plus owned resources, destroyed
//!   exactly once
//! - `Automation`: the registry (add/remove/update/load/shutdown)

pub mod automation;
pub mod error;
pub mod executor;
pub mod process;
pub mod service;

pub use automation::Automation;
pub use error::{AutomationError, AutomationResult, ResourceReleaseError};
pub use executor::{ActionExecutor, RetryPolicy};
pub use process::AccountProcess;
pub use service::AutomationService;
