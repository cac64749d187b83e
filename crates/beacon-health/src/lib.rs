//! Pluggable health checks with per-checker isolation.
//!
//! Checkers implement [`HealthChecker`] and are registered by name in the
//! [`registry::HealthCheckRegistry`]. A run executes every checker
//! concurrently under a hard timeout; failures, timeouts and panics become
//! synthetic `unhealthy` results instead of errors. Built-in checkers cover
//! database reachability, Redis and HTTP endpoints.

pub mod checkers;
pub mod registry;


use anyhow::Result;
use async_trait::async_trait;
use beacon_common::types::HealthCheckResult;
use std::time::Duration;

pub use registry::{HealthCheckRegistry, HealthSummary};

/// A probe reporting the health of one dependency.
///
/// The registry keys checkers by [`name`](HealthChecker::name); registering a
/// second checker under the same name replaces the first.
#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// Registry key and the `name` stamped on every result.
    fn name(&self) -> &str;

    /// Probes the dependency.
    ///
    /// # Errors
    ///
    /// Any error is converted by the registry into an `unhealthy` result
    /// carrying the error message.
    async fn check(&self) -> Result<HealthCheckResult>;

    /// Per-checker override of the registry's hard timeout.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}
