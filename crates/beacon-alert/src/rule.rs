use crate::error::{AlertError, Result};
use beacon_common::types::{AlertAction, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Longest breach a rule may require before triggering (30 days).
pub const MAX_DURATION_SECS: u64 = 30 * 24 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = ">", alias = "gt", alias = "greater_than")]
    GreaterThan,
    #[serde(rename = "<", alias = "lt", alias = "less_than")]
    LessThan,
    #[serde(rename = ">=", alias = "gte", alias = "greater_equal")]
    GreaterEqual,
    #[serde(rename = "<=", alias = "lte", alias = "less_equal")]
    LessEqual,
    #[serde(rename = "==", alias = "eq", alias = "equal")]
    Equal,
    #[serde(rename = "!=", alias = "ne", alias = "not_equal")]
    NotEqual,
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            ">" | "gt" | "greater_than" => Ok(Self::GreaterThan),
            "<" | "lt" | "less_than" => Ok(Self::LessThan),
            ">=" | "gte" | "greater_equal" => Ok(Self::GreaterEqual),
            "<=" | "lte" | "less_equal" => Ok(Self::LessEqual),
            "==" | "eq" | "equal" => Ok(Self::Equal),
            "!=" | "ne" | "not_equal" => Ok(Self::NotEqual),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GreaterThan => write!(f, ">"),
            Self::LessThan => write!(f, "<"),
            Self::GreaterEqual => write!(f, ">="),
            Self::LessEqual => write!(f, "<="),
            Self::Equal => write!(f, "=="),
            Self::NotEqual => write!(f, "!="),
        }
    }
}

impl CompareOp {
    /// Exact float comparison, including for `==` and `!=`.
    pub fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
            Self::GreaterEqual => value >= threshold,
            Self::LessEqual => value <= threshold,
            Self::Equal => value == threshold,
            Self::NotEqual => value != threshold,
        }
    }

    pub(crate) fn phrase(&self) -> &'static str {
        match self {
            Self::GreaterThan => "above",
            Self::LessThan => "below",
            Self::GreaterEqual => "at or above",
            Self::LessEqual => "at or below",
            Self::Equal => "equal to",
            Self::NotEqual => "different from",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCondition {
    pub operator: CompareOp,
    pub threshold: f64,
    /// Minimum sustained breach before triggering. Only honoured when the
    /// engine's policy enables duration enforcement.
    #[serde(default)]
    pub duration_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub metric: String,
    pub condition: AlertCondition,
    pub severity: Severity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub actions: Vec<AlertAction>,
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,
    #[serde(default)]
    pub trigger_count: u64,
}

fn default_enabled() -> bool {
    true
}

impl AlertRule {
    /// A new enabled rule with no actions.
    ///
    /// # Examples
    ///
    /// ```
    /// use beacon_alert::{AlertRule, CompareOp};
    /// use beacon_common::types::Severity;
    ///
    /// let rule = AlertRule::new("slow-api", "p99", CompareOp::GreaterThan, 500.0, Severity::High);
    /// assert!(rule.enabled);
    /// assert_eq!(rule.trigger_count, 0);
    /// assert!(rule.validate().is_ok());
    /// ```
    pub fn new(id: &str, metric: &str, operator: CompareOp, threshold: f64, severity: Severity) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            metric: metric.to_string(),
            condition: AlertCondition {
                operator,
                threshold,
                duration_secs: None,
            },
            severity,
            enabled: true,
            actions: Vec::new(),
            last_triggered: None,
            trigger_count: 0,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_action(mut self, action: AlertAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_duration_secs(mut self, secs: u64) -> Self {
        self.condition.duration_secs = Some(secs);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(AlertError::InvalidRule("id must not be empty".into()));
        }
        if self.metric.trim().is_empty() {
            return Err(AlertError::InvalidRule(format!(
                "rule '{}' has no target metric",
                self.id
            )));
        }
        if !self.condition.threshold.is_finite() {
            return Err(AlertError::InvalidRule(format!(
                "rule '{}' threshold must be finite",
                self.id
            )));
        }
        if let Some(secs) = self.condition.duration_secs {
            if secs > MAX_DURATION_SECS {
                return Err(AlertError::InvalidRule(format!(
                    "rule '{}' duration_secs {secs} exceeds {MAX_DURATION_SECS}",
                    self.id
                )));
            }
        }
        for action in &self.actions {
            match action {
                AlertAction::Webhook { url } if url.trim().is_empty() => {
                    return Err(AlertError::InvalidRule(format!(
                        "rule '{}' has a webhook action without url",
                        self.id
                    )));
                }
                AlertAction::Email { to } if to.is_empty() => {
                    return Err(AlertError::InvalidRule(format!(
                        "rule '{}' has an email action without recipients",
                        self.id
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Required breach length, or `None` when the rule triggers at once.
    /// Out-of-range values yield `Err` instead of wrapping.
    pub fn hold_duration(&self) -> std::result::Result<Option<chrono::Duration>, u64> {
        match self.condition.duration_secs.filter(|s| *s > 0) {
            None => Ok(None),
            Some(secs) => i64::try_from(secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .map(Some)
                .ok_or(secs),
        }
    }

    pub fn is_breached(&self, value: f64) -> bool {
        self.condition.operator.check(value, self.condition.threshold)
    }
}
