use crate::error::{AlertError, Result};
use crate::rule::AlertRule;
use beacon_common::types::AlertEvent;
use beacon_storage::MetricReader;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Behaviour switches for the two ambiguous corners of rule evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPolicy {
    /// Resolve a rule's active alert on the first tick after it is disabled.
    /// When false, the alert persists until re-enabled or cleared.
    #[serde(default)]
    pub resolve_on_disable: bool,
    /// Require `condition.duration_secs` of continuous breach before
    /// triggering. When false, the first breaching tick triggers.
    #[serde(default)]
    pub enforce_duration: bool,
}

#[derive(Debug, Clone)]
pub enum AlertTransition {
    Triggered(AlertEvent),
    Resolved(AlertEvent),
}

impl AlertTransition {
    pub fn event(&self) -> &AlertEvent {
        match self {
            AlertTransition::Triggered(e) | AlertTransition::Resolved(e) => e,
        }
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self, AlertTransition::Triggered(_))
    }
}

pub struct AlertEngine {
    rules: Vec<AlertRule>,
    /// Keyed by rule id; at most one unresolved event per rule.
    active: HashMap<String, AlertEvent>,
    breach_started: HashMap<String, DateTime<Utc>>,
    history: VecDeque<AlertEvent>,
    history_limit: usize,
    policy: AlertPolicy,
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(AlertPolicy::default())
    }
}

impl AlertEngine {
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            rules: Vec::new(),
            active: HashMap::new(),
            breach_started: HashMap::new(),
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            policy,
        }
    }

    pub fn policy(&self) -> AlertPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: AlertPolicy) {
        self.policy = policy;
    }

    /// Rules in insertion order.
    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    pub fn get_rule(&self, id: &str) -> Option<&AlertRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn add_rule(&mut self, rule: AlertRule) -> Result<()> {
        rule.validate()?;
        if self.get_rule(&rule.id).is_some() {
            return Err(AlertError::DuplicateRule(rule.id));
        }
        tracing::info!(rule_id = %rule.id, metric = %rule.metric, "Alert rule added");
        self.rules.push(rule);
        Ok(())
    }

    /// Replace a rule's definition. Trigger bookkeeping is carried over and
    /// an active alert stays active until the next evaluation decides.
    pub fn update_rule(&mut self, mut rule: AlertRule) -> Result<()> {
        rule.validate()?;
        let existing = self
            .rules
            .iter_mut()
            .find(|r| r.id == rule.id)
            .ok_or_else(|| AlertError::RuleNotFound(rule.id.clone()))?;
        rule.trigger_count = rule.trigger_count.max(existing.trigger_count);
        rule.last_triggered = rule.last_triggered.max(existing.last_triggered);
        *existing = rule;
        self.breach_started.remove(&existing.id);
        Ok(())
    }

    /// Remove a rule. Its active alert, if any, is closed into history.
    pub fn remove_rule(&mut self, id: &str) -> Result<AlertRule> {
        let pos = self
            .rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AlertError::RuleNotFound(id.to_string()))?;
        let rule = self.rules.remove(pos);
        self.breach_started.remove(id);
        if let Some(mut event) = self.active.remove(id) {
            event.resolve(Utc::now());
            archive(&mut self.history, self.history_limit, event);
        }
        tracing::info!(rule_id = %id, "Alert rule removed");
        Ok(rule)
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AlertError::RuleNotFound(id.to_string()))?;
        rule.enabled = enabled;
        if !enabled {
            self.breach_started.remove(id);
        }
        Ok(())
    }

    /// Currently triggered alerts, oldest first.
    pub fn active_alerts(&self) -> Vec<AlertEvent> {
        let mut alerts: Vec<AlertEvent> = self.active.values().cloned().collect();
        alerts.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        alerts
    }

    pub fn active_alert(&self, rule_id: &str) -> Option<&AlertEvent> {
        self.active.get(rule_id)
    }

    /// Recently resolved alerts, newest first.
    pub fn history(&self) -> Vec<AlertEvent> {
        self.history.iter().rev().cloned().collect()
    }

    /// Manually resolve a rule's active alert.
    pub fn clear_alert(&mut self, rule_id: &str, now: DateTime<Utc>) -> Result<AlertEvent> {
        let mut event = self
            .active
            .remove(rule_id)
            .ok_or_else(|| AlertError::NoActiveAlert(rule_id.to_string()))?;
        event.resolve(now);
        self.breach_started.remove(rule_id);
        archive(&mut self.history, self.history_limit, event.clone());
        Ok(event)
    }

    /// One evaluation tick over every rule.
    ///
    /// Latest values are read once up front so all rules see the same view.
    /// Rules whose metric has no observation are skipped: they neither
    /// trigger nor resolve.
    pub fn evaluate(&mut self, reader: &dyn MetricReader, now: DateTime<Utc>) -> Vec<AlertTransition> {
        let metric_names: Vec<&str> = self.rules.iter().map(|r| r.metric.as_str()).collect();
        let latest = reader.latest_values(&metric_names);
        let mut transitions = Vec::new();

        for rule in self.rules.iter_mut() {
            if !rule.enabled {
                if self.policy.resolve_on_disable {
                    if let Some(mut event) = self.active.remove(&rule.id) {
                        event.resolve(now);
                        tracing::info!(rule_id = %rule.id, "Alert resolved because rule is disabled");
                        archive(&mut self.history, self.history_limit, event.clone());
                        transitions.push(AlertTransition::Resolved(event));
                    }
                }
                continue;
            }

            let Some(&value) = latest.get(&rule.metric) else {
                tracing::trace!(rule_id = %rule.id, metric = %rule.metric, "No data, skipping rule");
                continue;
            };
            let breached = rule.is_breached(value);

            match (self.active.contains_key(&rule.id), breached) {
                (false, true) => {
                    if self.policy.enforce_duration {
                        match rule.hold_duration() {
                            Ok(None) => {}
                            Ok(Some(hold)) => {
                                let since = *self.breach_started.entry(rule.id.clone()).or_insert(now);
                                if now.signed_duration_since(since) < hold {
                                    continue;
                                }
                            }
                            Err(secs) => {
                                tracing::warn!(rule_id = %rule.id, duration_secs = secs, "Rule duration out of range, not triggering");
                                continue;
                            }
                        }
                    }
                    self.breach_started.remove(&rule.id);

                    let event = AlertEvent {
                        id: beacon_common::id::next_prefixed_id("alert"),
                        rule_id: rule.id.clone(),
                        rule_name: rule.name.clone(),
                        metric_name: rule.metric.clone(),
                        value,
                        threshold: rule.condition.threshold,
                        severity: rule.severity,
                        message: format!(
                            "{} is {:.2}, {} threshold {:.2}",
                            rule.metric,
                            value,
                            rule.condition.operator.phrase(),
                            rule.condition.threshold,
                        ),
                        timestamp: now,
                        resolved: None,
                        duration_ms: None,
                    };
                    rule.trigger_count += 1;
                    rule.last_triggered = Some(now);
                    tracing::warn!(
                        rule_id = %rule.id,
                        severity = %rule.severity,
                        value,
                        threshold = rule.condition.threshold,
                        "Alert triggered"
                    );
                    self.active.insert(rule.id.clone(), event.clone());
                    transitions.push(AlertTransition::Triggered(event));
                }
                (true, false) => {
                    self.breach_started.remove(&rule.id);
                    if let Some(mut event) = self.active.remove(&rule.id) {
                        event.resolve(now);
                        tracing::info!(
                            rule_id = %rule.id,
                            value,
                            duration_ms = event.duration_ms,
                            "Alert resolved"
                        );
                        archive(&mut self.history, self.history_limit, event.clone());
                        transitions.push(AlertTransition::Resolved(event));
                    }
                }
                (false, false) => {
                    self.breach_started.remove(&rule.id);
                }
                (true, true) => {}
            }
        }

        transitions
    }
}

fn archive(history: &mut VecDeque<AlertEvent>, limit: usize, event: AlertEvent) {
    history.push_back(event);
    while history.len() > limit {
        history.pop_front();
    }
}
