//! Prometheus metrics for the automation pilot.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_int_gauge, Counter, CounterVec, IntGauge,
};

/// Total ticks executed, by action and outcome status.
pub static TICKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "stw_ticks_total",
        "Total automation ticks executed",
        &["action", "status"]
    )
    .unwrap()
});

/// Total in-tick retry attempts, by action.
pub static TICK_RETRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "stw_tick_retries_total",
        "Total in-tick retry attempts",
        &["action"]
    )
    .unwrap()
});

/// Total actions force-disabled after a fatal tick.
pub static ACTIONS_DISABLED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "stw_actions_disabled_total",
        "Total actions force-disabled after a fatal tick",
        &["action"]
    )
    .unwrap()
});

/// Accounts currently registered.
pub static ACTIVE_ACCOUNTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("stw_active_accounts", "Accounts currently registered").unwrap()
});

/// Total daily scheduler fires.
pub static SCHEDULER_FIRES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!("stw_scheduler_fires_total", "Total daily scheduler fires").unwrap()
});

/// Facade for recording metrics.
pub struct Metrics;

impl Metrics {
    pub fn tick_completed(action: &str, status: &str) {
        TICKS_TOTAL.with_label_values(&[action, status]).inc();
    }

    pub fn tick_retry(action: &str) {
        TICK_RETRIES_TOTAL.with_label_values(&[action]).inc();
    }

    pub fn action_disabled(action: &str) {
        ACTIONS_DISABLED_TOTAL.with_label_values(&[action]).inc();
    }

    pub fn account_added() {
        ACTIVE_ACCOUNTS.inc();
    }

    pub fn account_removed() {
        ACTIVE_ACCOUNTS.dec();
    }

    pub fn scheduler_fired() {
        SCHEDULER_FIRES_TOTAL.inc();
    }
}
