use crate::HealthChecker;
use anyhow::{Context, Result};
use async_trait::async_trait;
use beacon_common::types::HealthCheckResult;
use std::time::{Duration, Instant};

/// Cache reachability probe: sends `PING` to a Redis server.
pub struct RedisChecker {
    name: String,
    client: redis::Client,
    degraded_after: Duration,
}

impl RedisChecker {
    /// `url` is a standard Redis URL such as `redis://127.0.0.1:6379/0`.
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .with_context(|| format!("invalid redis url: {url}"))?;
        Ok(Self {
            name: "redis".to_string(),
            client,
            degraded_after: Duration::from_millis(200),
        })
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_degraded_after(mut self, threshold: Duration) -> Self {
        self.degraded_after = threshold;
        self
    }
}

#[async_trait]
impl HealthChecker for RedisChecker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> Result<HealthCheckResult> {
        let started = Instant::now();
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("redis connection failed")?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("redis PING failed")?;

        let elapsed = started.elapsed();
        let latency_ms = elapsed.as_millis() as u64;
        let result = if !pong.eq_ignore_ascii_case("PONG") {
            HealthCheckResult::degraded(&self.name, format!("Unexpected PING reply: {pong}"))
        } else if elapsed > self.degraded_after {
            HealthCheckResult::degraded(
                &self.name,
                format!("Redis reachable but slow ({latency_ms}ms)"),
            )
        } else {
            HealthCheckResult::healthy(&self.name, "Redis reachable")
        };
        Ok(result
            .with_duration_ms(latency_ms)
            .with_detail("latency_ms", latency_ms))
    }
}
