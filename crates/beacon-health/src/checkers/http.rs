use crate::HealthChecker;
use anyhow::{Context, Result};
use async_trait::async_trait;
use beacon_common::types::HealthCheckResult;
use std::time::{Duration, Instant};

/// Probes an HTTP endpoint with a hard per-call timeout.
///
/// Healthy when the response status equals `expected_status`, or is any 2xx
/// when no status is configured.
pub struct HttpChecker {
    name: String,
    url: String,
    expected_status: Option<u16>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new(name: &str, url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            name: name.to_string(),
            url: url.to_string(),
            expected_status: None,
            timeout,
            client,
        })
    }

    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = Some(status);
        self
    }
}

#[async_trait]
impl HealthChecker for HttpChecker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> Result<HealthCheckResult> {
        let started = Instant::now();
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?;
        let status = resp.status();
        let latency_ms = started.elapsed().as_millis() as u64;

        let ok = match self.expected_status {
            Some(expected) => status.as_u16() == expected,
            None => status.is_success(),
        };
        let result = if ok {
            HealthCheckResult::healthy(&self.name, format!("HTTP {status}"))
        } else {
            HealthCheckResult::unhealthy(&self.name, format!("Unexpected HTTP status {status}"))
        };
        Ok(result
            .with_duration_ms(latency_ms)
            .with_detail("url", self.url.as_str())
            .with_detail("status_code", u64::from(status.as_u16())))
    }

    fn timeout(&self) -> Option<Duration> {
        // Backstop slightly above the client timeout.
        Some(self.timeout + Duration::from_millis(250))
    }
}
