//! Metrics for API client traffic.
//!
//! [`MetricsCollector`] keeps in-process aggregates that callers can read back
//! as a [`MetricsSnapshot`], including a 0–100 health score. Every event is also
//! forwarded to OpenTelemetry instruments on the global meter, so an exporter
//! configured by the application picks them up without extra wiring.

#![warn(missing_docs)]

mod collector;
mod health;
mod snapshot;
mod telemetry;

pub use collector::MetricsCollector;
pub use health::{HealthStatus, health_score};
pub use snapshot::{MetricsSnapshot, ResponseTimeStats};
pub use telemetry::ApiTelemetry;
