use crate::error::MonitorError;
use beacon_alert::AlertPolicy;
use beacon_common::types::AlertAction;
use beacon_notify::channels::SmtpConfig;
use serde::Deserialize;
use std::time::Duration;

/// Upper bound for `data_retention_hours` (ten years).
pub const MAX_RETENTION_HOURS: u64 = 10 * 365 * 24;

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,
    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,
    #[serde(default = "default_alert_check_interval_secs")]
    pub alert_check_interval_secs: u64,
    #[serde(default = "default_data_retention_hours")]
    pub data_retention_hours: u64,
    #[serde(default = "default_max_data_points")]
    pub max_data_points: usize,
    #[serde(default = "default_true")]
    pub enable_alerts: bool,
    /// Gates request timing and the `performance.*` gauges.
    #[serde(default = "default_true")]
    pub enable_performance_monitoring: bool,
    #[serde(default = "default_true")]
    pub enable_system_monitoring: bool,
    /// Hard per-checker timeout; a checker may ask for its own.
    #[serde(default = "default_health_check_timeout_secs")]
    pub health_check_timeout_secs: u64,

    #[serde(default)]
    pub alert_policy: AlertPolicy,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Email actions are only deliverable when this is set.
    #[serde(default)]
    pub smtp: Option<SmtpConfig>,
    #[serde(default)]
    pub health_checks: Vec<HealthCheckConfig>,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Directive added to `RUST_LOG`, e.g. `beacon=debug`.
    #[serde(default = "default_log_directive")]
    pub directive: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directive: default_log_directive(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HealthCheckConfig {
    /// TCP reachability of a database endpoint.
    Database {
        name: String,
        address: String,
        #[serde(default)]
        connect_timeout_ms: Option<u64>,
        #[serde(default)]
        degraded_after_ms: Option<u64>,
    },
    Redis {
        name: String,
        url: String,
        #[serde(default)]
        degraded_after_ms: Option<u64>,
    },
    Http {
        name: String,
        url: String,
        #[serde(default = "default_http_timeout_ms")]
        timeout_ms: u64,
        #[serde(default)]
        expected_status: Option<u16>,
    },
}

impl HealthCheckConfig {
    pub fn name(&self) -> &str {
        match self {
            HealthCheckConfig::Database { name, .. }
            | HealthCheckConfig::Redis { name, .. }
            | HealthCheckConfig::Http { name, .. } => name,
        }
    }
}

/// A seed alert rule. Operator and severity are given as strings
/// (`">"`, `"gte"`, `"critical"` ...) and parsed when the rule is built.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub metric: String,
    pub operator: String,
    pub threshold: f64,
    #[serde(default = "default_rule_severity")]
    pub severity: String,
    #[serde(default)]
    pub duration_secs: Option<u64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub actions: Vec<AlertAction>,
}

fn default_metrics_interval_secs() -> u64 {
    30
}

fn default_health_check_interval_secs() -> u64 {
    60
}

fn default_alert_check_interval_secs() -> u64 {
    10
}

fn default_data_retention_hours() -> u64 {
    24
}

fn default_max_data_points() -> usize {
    beacon_storage::DEFAULT_MAX_DATA_POINTS
}

fn default_true() -> bool {
    true
}

fn default_health_check_timeout_secs() -> u64 {
    5
}

fn default_log_directive() -> String {
    "beacon=info".to_string()
}

fn default_http_timeout_ms() -> u64 {
    3000
}

fn default_rule_severity() -> String {
    "medium".to_string()
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            metrics_interval_secs: default_metrics_interval_secs(),
            health_check_interval_secs: default_health_check_interval_secs(),
            alert_check_interval_secs: default_alert_check_interval_secs(),
            data_retention_hours: default_data_retention_hours(),
            max_data_points: default_max_data_points(),
            enable_alerts: true,
            enable_performance_monitoring: true,
            enable_system_monitoring: true,
            health_check_timeout_secs: default_health_check_timeout_secs(),
            alert_policy: AlertPolicy::default(),
            logging: LoggingConfig::default(),
            smtp: None,
            health_checks: Vec::new(),
            rules: Vec::new(),
        }
    }
}

impl MonitoringConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{path}': {e}"))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{path}': {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MonitorError> {
        let intervals = [
            ("metrics_interval_secs", self.metrics_interval_secs),
            ("health_check_interval_secs", self.health_check_interval_secs),
            ("alert_check_interval_secs", self.alert_check_interval_secs),
            ("health_check_timeout_secs", self.health_check_timeout_secs),
        ];
        for (field, value) in intervals {
            if value == 0 {
                return Err(MonitorError::InvalidConfig(format!("{field} must be positive")));
            }
        }
        if self.data_retention_hours == 0 || self.data_retention_hours > MAX_RETENTION_HOURS {
            return Err(MonitorError::InvalidConfig(format!(
                "data_retention_hours must be between 1 and {MAX_RETENTION_HOURS}, got {}",
                self.data_retention_hours
            )));
        }
        if self.max_data_points == 0 {
            return Err(MonitorError::InvalidConfig(
                "max_data_points must be positive".into(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for check in &self.health_checks {
            if !seen.insert(check.name()) {
                return Err(MonitorError::InvalidConfig(format!(
                    "duplicate health check '{}'",
                    check.name()
                )));
            }
        }
        Ok(())
    }

    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    pub fn alert_check_interval(&self) -> Duration {
        Duration::from_secs(self.alert_check_interval_secs)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs)
    }

    /// Retention window, or `None` when the hour count does not fit.
    pub fn retention(&self) -> Option<chrono::Duration> {
        i64::try_from(self.data_retention_hours)
            .ok()
            .and_then(chrono::Duration::try_hours)
    }
}
