use crate::HealthChecker;
use beacon_common::types::{HealthCheckResult, HealthStatus, Labels};
use beacon_storage::InMemoryStore;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Rollup of the most recent result of each registered checker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub degraded: usize,
}

impl HealthSummary {
    /// Worst status across checkers; healthy when nothing has run yet.
    pub fn overall(&self) -> HealthStatus {
        if self.unhealthy > 0 {
            HealthStatus::Unhealthy
        } else if self.degraded > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

pub struct HealthCheckRegistry {
    checkers: RwLock<HashMap<String, Arc<dyn HealthChecker>>>,
    last_results: RwLock<HashMap<String, HealthCheckResult>>,
    store: Arc<InMemoryStore>,
    timeout: Duration,
}

impl HealthCheckRegistry {
    pub fn new(store: Arc<InMemoryStore>, timeout: Duration) -> Self {
        Self {
            checkers: RwLock::new(HashMap::new()),
            last_results: RwLock::new(HashMap::new()),
            store,
            timeout,
        }
    }

    /// Register a checker. An existing checker with the same name is replaced.
    pub fn register(&self, checker: Arc<dyn HealthChecker>) {
        let name = checker.name().to_string();
        if self.checkers.write().insert(name.clone(), checker).is_some() {
            tracing::info!(checker = %name, "Health checker replaced");
        } else {
            tracing::info!(checker = %name, "Health checker registered");
        }
    }

    /// Remove a checker and its last result. Returns true if found.
    pub fn remove(&self, name: &str) -> bool {
        self.last_results.write().remove(name);
        self.checkers.write().remove(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.checkers.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.checkers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.read().is_empty()
    }

    /// Run every registered checker concurrently and return results in
    /// completion order. Never fails: broken checkers yield `unhealthy`.
    pub async fn run_all(&self) -> Vec<HealthCheckResult> {
        let checkers: Vec<Arc<dyn HealthChecker>> =
            self.checkers.read().values().cloned().collect();
        if checkers.is_empty() {
            return Vec::new();
        }

        let mut pending: FuturesUnordered<_> = checkers
            .into_iter()
            .map(|checker| {
                let timeout = checker.timeout().unwrap_or(self.timeout);
                run_isolated(checker, timeout)
            })
            .collect();

        let mut results = Vec::new();
        while let Some(result) = pending.next().await {
            self.publish(&result);
            results.push(result);
        }
        results
    }

    fn publish(&self, result: &HealthCheckResult) {
        let up = if result.is_healthy() { 1.0 } else { 0.0 };
        if let Err(e) = self.store.set_gauge(
            &format!("health_check_{}", result.name),
            up,
            Labels::new(),
        ) {
            tracing::warn!(checker = %result.name, error = %e, "Failed to record health gauge");
        }
        if let Err(e) = self.store.record_histogram(
            &format!("health_check_duration_{}", result.name),
            result.duration_ms as f64,
            Labels::new(),
        ) {
            tracing::warn!(checker = %result.name, error = %e, "Failed to record health duration");
        }

        // A checker removed mid-run must not leave a stale result behind.
        if self.checkers.read().contains_key(&result.name) {
            self.last_results
                .write()
                .insert(result.name.clone(), result.clone());
        }
    }

    /// Latest result per checker, ordered by checker name.
    pub fn last_results(&self) -> Vec<HealthCheckResult> {
        let mut results: Vec<HealthCheckResult> =
            self.last_results.read().values().cloned().collect();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        results
    }

    pub fn summary(&self) -> HealthSummary {
        let results = self.last_results.read();
        let mut summary = HealthSummary {
            total: results.len(),
            ..Default::default()
        };
        for result in results.values() {
            match result.status {
                HealthStatus::Healthy => summary.healthy += 1,
                HealthStatus::Unhealthy => summary.unhealthy += 1,
                HealthStatus::Degraded => summary.degraded += 1,
            }
        }
        summary
    }
}

/// Run one checker on its own task under `timeout`. Errors, timeouts and
/// panics are all folded into an `unhealthy` result.
async fn run_isolated(checker: Arc<dyn HealthChecker>, timeout: Duration) -> HealthCheckResult {
    let name = checker.name().to_string();
    let started = Instant::now();

    let handle = tokio::spawn(async move { tokio::time::timeout(timeout, checker.check()).await });
    let outcome = handle.await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let result = match outcome {
        Ok(Ok(Ok(mut result))) => {
            result.name = name;
            if result.duration_ms == 0 {
                result.duration_ms = elapsed_ms;
            }
            result
        }
        Ok(Ok(Err(e))) => HealthCheckResult::unhealthy(&name, format!("Health check failed: {e:#}"))
            .with_duration_ms(elapsed_ms),
        Ok(Err(_)) => HealthCheckResult::unhealthy(
            &name,
            format!("Health check timed out after {}ms", timeout.as_millis()),
        )
        .with_duration_ms(elapsed_ms),
        Err(e) => HealthCheckResult::unhealthy(&name, format!("Health check panicked: {e}"))
            .with_duration_ms(elapsed_ms),
    };

    match result.status {
        HealthStatus::Healthy => {
            tracing::debug!(checker = %result.name, duration_ms = result.duration_ms, "Health check passed")
        }
        HealthStatus::Degraded => {
            tracing::warn!(checker = %result.name, message = %result.message, "Health check degraded")
        }
        HealthStatus::Unhealthy => {
            tracing::warn!(checker = %result.name, message = %result.message, "Health check failed")
        }
    }
    result
}
