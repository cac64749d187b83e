#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use beacon_common::types::{HealthCheckResult, HealthStatus};
use beacon_health::HealthChecker;
use beacon_notify::{ActionChannel, ActionDispatcher, AlertNotice, AlertPhase};
use beacon_server::{MonitoringConfig, MonitoringEvent, MonitoringService};
use beacon_common::types::AlertAction;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub struct TestContext {
    pub service: Arc<MonitoringService>,
    pub actions: Arc<RecordingChannel>,
}

/// A service without system collectors whose `log` actions are captured.
pub fn build_test_context(configure: impl FnOnce(&mut MonitoringConfig)) -> Result<TestContext> {
    beacon_common::id::init(1, 1);
    let mut config = MonitoringConfig {
        enable_system_monitoring: false,
        health_check_timeout_secs: 1,
        ..Default::default()
    };
    configure(&mut config);

    let actions = Arc::new(RecordingChannel::default());
    let dispatcher = ActionDispatcher::new();
    dispatcher.register(actions.clone());
    let service = Arc::new(MonitoringService::with_dispatcher(config, dispatcher)?);
    Ok(TestContext { service, actions })
}

#[derive(Default)]
pub struct RecordingChannel {
    pub seen: Mutex<Vec<(String, AlertPhase)>>,
}

#[async_trait]
impl ActionChannel for RecordingChannel {
    fn kind(&self) -> &str {
        "log"
    }

    async fn send(&self, _action: &AlertAction, notice: &AlertNotice) -> Result<()> {
        self.seen.lock().push((notice.event.rule_id.clone(), notice.phase));
        Ok(())
    }
}

pub struct StaticChecker {
    pub name: &'static str,
    pub status: HealthStatus,
}

#[async_trait]
impl HealthChecker for StaticChecker {
    fn name(&self) -> &str {
        self.name
    }

    async fn check(&self) -> Result<HealthCheckResult> {
        Ok(HealthCheckResult::new(self.name, self.status, "static"))
    }
}

pub struct FailingChecker;

#[async_trait]
impl HealthChecker for FailingChecker {
    fn name(&self) -> &str {
        "failing"
    }

    async fn check(&self) -> Result<HealthCheckResult> {
        Err(anyhow!("dependency unreachable"))
    }
}

pub struct HangingChecker;

#[async_trait]
impl HealthChecker for HangingChecker {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn check(&self) -> Result<HealthCheckResult> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(HealthCheckResult::healthy("hanging", "never"))
    }
}

/// Drain every event already queued on `rx`.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<MonitoringEvent>) -> Vec<MonitoringEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Wait until `cond` holds, polling every few milliseconds.
pub async fn wait_for(mut cond: impl FnMut() -> bool) -> Result<()> {
    for _ in 0..200 {
        if cond() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Err(anyhow!("condition not met in time"))
}
