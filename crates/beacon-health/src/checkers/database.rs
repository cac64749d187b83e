use crate::HealthChecker;
use anyhow::{Context, Result};
use async_trait::async_trait;
use beacon_common::types::HealthCheckResult;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

/// Reachability probe for a database endpoint.
///
/// Opens a TCP connection to `address` (`host:port`). A connection slower
/// than `degraded_after` reports `degraded`.
pub struct DatabaseChecker {
    name: String,
    address: String,
    connect_timeout: Duration,
    degraded_after: Duration,
}

impl DatabaseChecker {
    pub fn new(address: &str) -> Self {
        Self {
            name: "database".to_string(),
            address: address.to_string(),
            connect_timeout: Duration::from_secs(3),
            degraded_after: Duration::from_millis(500),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_degraded_after(mut self, threshold: Duration) -> Self {
        self.degraded_after = threshold;
        self
    }
}

#[async_trait]
impl HealthChecker for DatabaseChecker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> Result<HealthCheckResult> {
        let started = Instant::now();
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(self.address.as_str()))
            .await
            .with_context(|| {
                format!(
                    "connect to {} timed out after {}ms",
                    self.address,
                    self.connect_timeout.as_millis()
                )
            })?
            .with_context(|| format!("database at {} is unreachable", self.address))?;
        drop(stream);

        let elapsed = started.elapsed();
        let latency_ms = elapsed.as_millis() as u64;
        let result = if elapsed > self.degraded_after {
            HealthCheckResult::degraded(
                &self.name,
                format!("Database reachable but slow ({latency_ms}ms)"),
            )
        } else {
            HealthCheckResult::healthy(&self.name, "Database reachable")
        };
        Ok(result
            .with_duration_ms(latency_ms)
            .with_detail("address", self.address.as_str())
            .with_detail("latency_ms", latency_ms))
    }
}
