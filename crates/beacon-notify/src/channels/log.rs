use crate::{ActionChannel, AlertNotice, AlertPhase};
use anyhow::Result;
use async_trait::async_trait;
use beacon_common::types::{AlertAction, Severity};

/// Writes alerts to the tracing log, at a level chosen by severity.
pub struct LogChannel;

#[async_trait]
impl ActionChannel for LogChannel {
    fn kind(&self) -> &str {
        "log"
    }

    async fn send(&self, action: &AlertAction, notice: &AlertNotice) -> Result<()> {
        if !matches!(action, AlertAction::Log) {
            return Err(super::mismatch(self.kind(), action).into());
        }
        let event = &notice.event;
        let headline = notice.headline();
        match (notice.phase, event.severity) {
            (AlertPhase::Resolved, _) => tracing::info!(
                alert_id = %event.id,
                rule_id = %event.rule_id,
                duration_ms = event.duration_ms,
                "{headline}"
            ),
            (AlertPhase::Triggered, Severity::Critical | Severity::High) => tracing::error!(
                alert_id = %event.id,
                rule_id = %event.rule_id,
                value = event.value,
                "{headline}"
            ),
            (AlertPhase::Triggered, Severity::Medium) => tracing::warn!(
                alert_id = %event.id,
                rule_id = %event.rule_id,
                value = event.value,
                "{headline}"
            ),
            (AlertPhase::Triggered, Severity::Low) => tracing::info!(
                alert_id = %event.id,
                rule_id = %event.rule_id,
                value = event.value,
                "{headline}"
            ),
        }
        Ok(())
    }
}
