//! Core domain types for the STW automation pilot.
//!
//! This crate provides fundamental types used throughout the automation system:
//! - `AccountId`: Unique identifier for an automated account
//! - `ActionKind`, `ActionConfig`, `ActionPatch`: Automation action definitions
//! - `ActionResult`, `ActionStatus`: Per-tick outcomes
//! - `AutomationEvent`: Outbound notification payloads
//! - `RegistrySnapshot`: Read-only view of the running registry

pub mod account;
pub mod action;
pub mod error;
pub mod event;
pub mod result;
pub mod snapshot;

pub use account::AccountId;
pub use action::{ActionConfig, ActionKind, ActionPatch, ActionSettings, DEFAULT_INTERVAL_SECS};
pub use error::{CoreError, Result};
pub use event::AutomationEvent;
pub use result::{ActionResult, ActionStatus, TickId};
pub use snapshot::{AccountState, RegistrySnapshot};
