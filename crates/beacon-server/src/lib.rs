//! In-process monitoring service: metric recording, health checks and
//! threshold alerting under three periodic schedules.
//!
//! [`MonitoringService`] is the composition root. It owns the metric store,
//! the health-check registry, the alert engine, the action dispatcher and
//! the [`scheduler::Scheduler`] driving the collection, health-check and
//! alert-evaluation loops. Construct one per process and share it by `Arc`.

pub mod config;
pub mod error;
pub mod events;
pub mod facade;
pub mod logging;
pub mod performance;
pub mod rule_builder;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use config::MonitoringConfig;
pub use error::MonitorError;
pub use events::{EventBus, MonitoringEvent};
pub use facade::{HealthReport, MonitoringService, MonitoringStats};
pub use performance::{PerformanceAggregator, PerformanceMetrics};
