//! Prometheus metrics and structured logging for the STW automation pilot.
//!
//! - Tick outcomes, retries and active-account gauges
//! - Structured JSON logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
