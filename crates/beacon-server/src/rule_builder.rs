use crate::config::{HealthCheckConfig, RuleConfig};
use anyhow::Result;
use beacon_alert::{AlertCondition, AlertEngine, AlertRule, CompareOp};
use beacon_common::types::Severity;
use beacon_health::checkers::{DatabaseChecker, HttpChecker, RedisChecker};
use beacon_health::HealthChecker;
use std::sync::Arc;
use std::time::Duration;

/// Convert a seed rule from the config file into an [`AlertRule`].
pub fn build_rule(cfg: &RuleConfig) -> Result<AlertRule> {
    let operator: CompareOp = cfg
        .operator
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{e}"))?;
    let severity: Severity = cfg
        .severity
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{e}"))?;
    let rule = AlertRule {
        id: cfg.id.clone(),
        name: cfg.name.clone().unwrap_or_else(|| cfg.id.clone()),
        metric: cfg.metric.clone(),
        condition: AlertCondition {
            operator,
            threshold: cfg.threshold,
            duration_secs: cfg.duration_secs,
        },
        severity,
        enabled: cfg.enabled,
        actions: cfg.actions.clone(),
        last_triggered: None,
        trigger_count: 0,
    };
    rule.validate()?;
    Ok(rule)
}

/// Add every valid seed rule to `engine`, skipping invalid ones with
/// warnings. Returns the number of rules added.
pub fn seed_rules(engine: &mut AlertEngine, rules: &[RuleConfig]) -> usize {
    let mut added = 0;
    for cfg in rules {
        match build_rule(cfg).and_then(|rule| engine.add_rule(rule).map_err(Into::into)) {
            Ok(()) => added += 1,
            Err(e) => tracing::warn!(
                rule_id = %cfg.id,
                metric = %cfg.metric,
                error = %e,
                "Skipping invalid alert rule"
            ),
        }
    }
    added
}

/// Instantiate a built-in health checker from its config entry.
pub fn build_checker(cfg: &HealthCheckConfig) -> Result<Arc<dyn HealthChecker>> {
    let checker: Arc<dyn HealthChecker> = match cfg {
        HealthCheckConfig::Database {
            name,
            address,
            connect_timeout_ms,
            degraded_after_ms,
        } => {
            let mut checker = DatabaseChecker::new(address).with_name(name);
            if let Some(ms) = connect_timeout_ms {
                checker = checker.with_connect_timeout(Duration::from_millis(*ms));
            }
            if let Some(ms) = degraded_after_ms {
                checker = checker.with_degraded_after(Duration::from_millis(*ms));
            }
            Arc::new(checker)
        }
        HealthCheckConfig::Redis {
            name,
            url,
            degraded_after_ms,
        } => {
            let mut checker = RedisChecker::new(url)?.with_name(name);
            if let Some(ms) = degraded_after_ms {
                checker = checker.with_degraded_after(Duration::from_millis(*ms));
            }
            Arc::new(checker)
        }
        HealthCheckConfig::Http {
            name,
            url,
            timeout_ms,
            expected_status,
        } => {
            let mut checker = HttpChecker::new(name, url, Duration::from_millis(*timeout_ms))?;
            if let Some(status) = expected_status {
                checker = checker.with_expected_status(*status);
            }
            Arc::new(checker)
        }
    };
    Ok(checker)
}
