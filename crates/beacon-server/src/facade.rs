use crate::config::MonitoringConfig;
use crate::error::Result;
use crate::events::{EventBus, MonitoringEvent};
use crate::performance::{PerformanceAggregator, PerformanceMetrics};
use crate::rule_builder;
use crate::scheduler::{Job, Scheduler};
use beacon_alert::{AlertEngine, AlertRule, AlertTransition};
use beacon_collector::{Collector, SystemInfo};
use beacon_common::types::{AlertAction, AlertEvent, HealthCheckResult, HealthStatus, Labels, Metric, MetricType};
use beacon_health::{HealthCheckRegistry, HealthChecker, HealthSummary};
use beacon_notify::channels::ChannelMessage;
use beacon_notify::{ActionDispatcher, AlertNotice};
use beacon_storage::percentile::Percentiles;
use beacon_storage::{InMemoryStore, MetricFilter, StorageError};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Default)]
struct Counters {
    metrics_recorded: AtomicU64,
    recording_errors: AtomicU64,
    health_checks_run: AtomicU64,
    alert_evaluations: AtomicU64,
    alerts_triggered: AtomicU64,
    alerts_resolved: AtomicU64,
    collection_runs: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn reset(&self) {
        for counter in [
            &self.metrics_recorded,
            &self.recording_errors,
            &self.health_checks_run,
            &self.alert_evaluations,
            &self.alerts_triggered,
            &self.alerts_resolved,
            &self.collection_runs,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitoringStats {
    pub started_at: DateTime<Utc>,
    pub uptime_secs: i64,
    pub metrics_recorded: u64,
    pub recording_errors: u64,
    pub health_checks_run: u64,
    pub alert_evaluations: u64,
    pub alerts_triggered: u64,
    pub alerts_resolved: u64,
    pub collection_runs: u64,
    pub metric_count: usize,
    pub data_points: usize,
    pub health_checkers: usize,
    pub alert_rules: usize,
    pub active_alerts: usize,
    pub scheduler_tasks: usize,
    pub event_subscribers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub summary: HealthSummary,
    pub results: Vec<HealthCheckResult>,
}

/// Everything the scheduled jobs touch. Kept apart from the scheduler so
/// the loops never own the handle that aborts them.
struct MonitorCore {
    config: MonitoringConfig,
    store: Arc<InMemoryStore>,
    health: HealthCheckRegistry,
    alerts: Mutex<AlertEngine>,
    dispatcher: ActionDispatcher,
    performance: PerformanceAggregator,
    events: EventBus,
    collectors: Mutex<Vec<Box<dyn Collector>>>,
    counters: Counters,
    started_at: DateTime<Utc>,
}

/// The monitoring subsystem's public surface.
///
/// One instance per process, constructed explicitly and shared by `Arc`.
/// Recording and evaluation never fail towards the caller; rule CRUD and
/// metric queries return typed errors.
pub struct MonitoringService {
    core: Arc<MonitorCore>,
    scheduler: Scheduler,
    notifications: Mutex<Option<mpsc::UnboundedReceiver<ChannelMessage>>>,
}

impl MonitoringService {
    /// Build a service with the built-in action channels. Email delivery is
    /// available only when `config.smtp` is set.
    pub fn new(config: MonitoringConfig) -> anyhow::Result<Self> {
        let (dispatcher, notifications) = ActionDispatcher::with_builtin_channels(config.smtp.as_ref())?;
        let service = Self::with_dispatcher(config, dispatcher)?;
        *service.notifications.lock() = Some(notifications);
        Ok(service)
    }

    /// Build a service around a caller-supplied dispatcher. Seed rules and
    /// health checks from `config` are installed; invalid entries are
    /// skipped with a warning.
    pub fn with_dispatcher(config: MonitoringConfig, dispatcher: ActionDispatcher) -> anyhow::Result<Self> {
        config.validate()?;
        let store = Arc::new(InMemoryStore::new(config.max_data_points));
        let health = HealthCheckRegistry::new(store.clone(), config.health_check_timeout());

        for check in &config.health_checks {
            match rule_builder::build_checker(check) {
                Ok(checker) => health.register(checker),
                Err(e) => tracing::warn!(checker = check.name(), error = %e, "Skipping invalid health check"),
            }
        }

        let mut engine = AlertEngine::new(config.alert_policy);
        let seeded = rule_builder::seed_rules(&mut engine, &config.rules);
        if seeded > 0 {
            tracing::info!(count = seeded, "Seeded alert rules from config");
        }

        let collectors = if config.enable_system_monitoring {
            beacon_collector::default_collectors()
        } else {
            Vec::new()
        };

        Ok(Self {
            core: Arc::new(MonitorCore {
                performance: PerformanceAggregator::new(store.clone()),
                config,
                store,
                health,
                alerts: Mutex::new(engine),
                dispatcher,
                events: EventBus::new(),
                collectors: Mutex::new(collectors),
                counters: Counters::default(),
                started_at: Utc::now(),
            }),
            scheduler: Scheduler::new(),
            notifications: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.core.config
    }

    /// Direct access to the underlying store, for readers that want more
    /// than the facade exposes.
    pub fn store(&self) -> Arc<InMemoryStore> {
        self.core.store.clone()
    }

    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.core.dispatcher
    }

    // ---- Recording ----

    pub fn record_metric(&self, name: &str, value: f64, labels: Labels) {
        self.core.observe(self.core.store.record(name, value, labels));
    }

    pub fn increment_counter(&self, name: &str, delta: f64, labels: Labels) {
        self.core.observe(self.core.store.increment_counter(name, delta, labels));
    }

    pub fn set_gauge(&self, name: &str, value: f64, labels: Labels) {
        self.core.observe(self.core.store.set_gauge(name, value, labels));
    }

    pub fn record_histogram(&self, name: &str, value: f64, labels: Labels) {
        self.core.observe(self.core.store.record_histogram(name, value, labels));
    }

    pub fn record_summary(&self, name: &str, value: f64, labels: Labels) {
        self.core.observe(self.core.store.record_summary(name, value, labels));
    }

    /// Declare a metric with a description and unit before it is observed.
    pub fn register_metric(&self, name: &str, metric_type: MetricType, description: &str, unit: &str) -> Result<()> {
        Ok(self.core.store.register(name, metric_type, description, unit)?)
    }

    /// No-op when performance monitoring is disabled.
    pub fn record_request_time(&self, duration_ms: f64, success: bool) {
        if !self.core.config.enable_performance_monitoring {
            return;
        }
        self.core.performance.record_request_time(duration_ms, success);
    }

    // ---- Metric queries ----

    pub fn get_metric(&self, name: &str) -> Option<Metric> {
        self.core.store.get(name)
    }

    pub fn get_all_metrics(&self) -> Vec<Metric> {
        self.core.store.list()
    }

    pub fn query_metrics(&self, filter: &MetricFilter) -> Result<Vec<Metric>> {
        Ok(self.core.store.query(filter)?)
    }

    pub fn get_percentiles(&self, name: &str) -> Option<Percentiles> {
        self.core.store.percentiles(name)
    }

    /// Clear one metric, or all of them when `name` is `None`.
    pub fn reset_metrics(&self, name: Option<&str>) -> Result<()> {
        self.core.store.reset(name)?;
        Ok(())
    }

    // ---- Health ----

    pub fn add_health_checker(&self, checker: Arc<dyn HealthChecker>) {
        self.core.health.register(checker);
    }

    pub fn remove_health_checker(&self, name: &str) -> bool {
        self.core.health.remove(name)
    }

    pub fn health_checker_names(&self) -> Vec<String> {
        self.core.health.names()
    }

    /// Run every checker now. Results arrive in completion order and are
    /// also published as events.
    pub async fn run_health_checks(&self) -> Vec<HealthCheckResult> {
        self.core.run_health_checks().await
    }

    /// Latest result per checker, without running anything.
    pub fn get_health_status(&self) -> HealthReport {
        let summary = self.core.health.summary();
        HealthReport {
            status: summary.overall(),
            summary,
            results: self.core.health.last_results(),
        }
    }

    // ---- Alert rules ----

    pub fn add_alert_rule(&self, rule: AlertRule) -> Result<()> {
        Ok(self.core.alerts.lock().add_rule(rule)?)
    }

    pub fn update_alert_rule(&self, rule: AlertRule) -> Result<()> {
        Ok(self.core.alerts.lock().update_rule(rule)?)
    }

    /// Remove a rule; its active alert, if any, moves to history.
    pub fn remove_alert_rule(&self, id: &str) -> Result<AlertRule> {
        Ok(self.core.alerts.lock().remove_rule(id)?)
    }

    pub fn get_alert_rule(&self, id: &str) -> Option<AlertRule> {
        self.core.alerts.lock().get_rule(id).cloned()
    }

    pub fn get_all_alert_rules(&self) -> Vec<AlertRule> {
        self.core.alerts.lock().rules().to_vec()
    }

    pub fn set_alert_rule_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        Ok(self.core.alerts.lock().set_enabled(id, enabled)?)
    }

    pub fn get_active_alerts(&self) -> Vec<AlertEvent> {
        self.core.alerts.lock().active_alerts()
    }

    /// Resolved alerts, newest first.
    pub fn get_alert_history(&self) -> Vec<AlertEvent> {
        self.core.alerts.lock().history()
    }

    /// Manually resolve a rule's alert. Publishes `AlertResolved`; rule
    /// actions are not run.
    pub fn clear_alert(&self, rule_id: &str) -> Result<AlertEvent> {
        let event = self.core.alerts.lock().clear_alert(rule_id, Utc::now())?;
        tracing::info!(rule_id, alert_id = %event.id, "Alert cleared manually");
        self.core.events.publish(MonitoringEvent::AlertResolved(event.clone()));
        Ok(event)
    }

    /// One evaluation pass over all rules, dispatching actions for every
    /// transition.
    pub fn evaluate_alerts(&self) -> Vec<AlertTransition> {
        self.core.evaluate_alerts()
    }

    // ---- Aggregates ----

    pub fn get_stats(&self) -> MonitoringStats {
        let core = &self.core;
        let c = &core.counters;
        let (alert_rules, active_alerts) = {
            let engine = core.alerts.lock();
            (engine.rules().len(), engine.active_alerts().len())
        };
        MonitoringStats {
            started_at: core.started_at,
            uptime_secs: (Utc::now() - core.started_at).num_seconds(),
            metrics_recorded: c.metrics_recorded.load(Ordering::Relaxed),
            recording_errors: c.recording_errors.load(Ordering::Relaxed),
            health_checks_run: c.health_checks_run.load(Ordering::Relaxed),
            alert_evaluations: c.alert_evaluations.load(Ordering::Relaxed),
            alerts_triggered: c.alerts_triggered.load(Ordering::Relaxed),
            alerts_resolved: c.alerts_resolved.load(Ordering::Relaxed),
            collection_runs: c.collection_runs.load(Ordering::Relaxed),
            metric_count: core.store.len(),
            data_points: core.store.total_points(),
            health_checkers: core.health.len(),
            alert_rules,
            active_alerts,
            scheduler_tasks: self.scheduler.active_tasks().len(),
            event_subscribers: core.events.subscriber_count(),
        }
    }

    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        self.core.performance.snapshot()
    }

    pub fn get_system_info(&self) -> SystemInfo {
        SystemInfo::collect()
    }

    /// Zero the service counters and the request buffer. Stored metrics,
    /// rules and alerts are untouched.
    pub fn reset_stats(&self) {
        self.core.counters.reset();
        self.core.performance.reset();
        tracing::info!("Monitoring stats reset");
    }

    /// Run every collector once and record the samples as gauges, then
    /// publish performance gauges and drop expired points.
    pub fn collect_now(&self) -> usize {
        self.core.collect()
    }

    // ---- Events ----

    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<MonitoringEvent> {
        self.core.events.subscribe()
    }

    /// Receiver for `notification` actions. Available once.
    pub fn take_notifications(&self) -> Option<mpsc::UnboundedReceiver<ChannelMessage>> {
        self.notifications.lock().take()
    }

    // ---- Lifecycle ----

    /// Start the periodic loops. Idempotent while running.
    pub fn start(&self) -> Result<bool> {
        let config = &self.core.config;
        let mut jobs = Vec::with_capacity(3);

        let core = self.core.clone();
        jobs.push(Job::new("collection", config.metrics_interval(), move || {
            let core = core.clone();
            async move {
                core.collect();
                Ok(())
            }
            .boxed()
        }));

        let core = self.core.clone();
        jobs.push(Job::new("health_checks", config.health_check_interval(), move || {
            let core = core.clone();
            async move {
                core.run_health_checks().await;
                Ok(())
            }
            .boxed()
        }));

        if config.enable_alerts {
            let core = self.core.clone();
            jobs.push(Job::new("alert_evaluation", config.alert_check_interval(), move || {
                let core = core.clone();
                async move {
                    core.evaluate_alerts();
                    Ok(())
                }
                .boxed()
            }));
        }

        let started = self.scheduler.start(jobs)?;
        if started {
            tracing::info!(
                alerts = config.enable_alerts,
                system = config.enable_system_monitoring,
                performance = config.enable_performance_monitoring,
                "Monitoring service started"
            );
        }
        Ok(started)
    }

    /// Stop the periodic loops. Safe to call any number of times.
    pub fn shutdown(&self) -> usize {
        self.scheduler.stop()
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn active_tasks(&self) -> Vec<&'static str> {
        self.scheduler.active_tasks()
    }
}

impl MonitorCore {
    fn observe(&self, outcome: std::result::Result<(), StorageError>) {
        match outcome {
            Ok(()) => Counters::bump(&self.counters.metrics_recorded, 1),
            Err(e) => {
                Counters::bump(&self.counters.recording_errors, 1);
                tracing::warn!(error = %e, "Rejected metric observation");
                self.events.publish(MonitoringEvent::Error {
                    source: "metrics".to_string(),
                    message: e.to_string(),
                });
            }
        }
    }

    async fn run_health_checks(&self) -> Vec<HealthCheckResult> {
        let results = self.health.run_all().await;
        Counters::bump(&self.counters.health_checks_run, results.len() as u64);
        for result in &results {
            self.events.publish(MonitoringEvent::HealthCheck(result.clone()));
        }
        results
    }

    fn evaluate_alerts(&self) -> Vec<AlertTransition> {
        // Actions are looked up under the same lock as evaluation so a
        // concurrent rule edit cannot pair a transition with foreign actions.
        let dispatches: Vec<(AlertTransition, Vec<AlertAction>)> = {
            let mut engine = self.alerts.lock();
            let transitions = engine.evaluate(self.store.as_ref(), Utc::now());
            transitions
                .into_iter()
                .map(|t| {
                    let actions = engine
                        .get_rule(&t.event().rule_id)
                        .map(|r| r.actions.clone())
                        .unwrap_or_default();
                    (t, actions)
                })
                .collect()
        };
        Counters::bump(&self.counters.alert_evaluations, 1);

        let mut transitions = Vec::with_capacity(dispatches.len());
        for (transition, actions) in dispatches {
            let notice = match &transition {
                AlertTransition::Triggered(event) => {
                    Counters::bump(&self.counters.alerts_triggered, 1);
                    self.events.publish(MonitoringEvent::AlertTriggered(event.clone()));
                    AlertNotice::triggered(event.clone())
                }
                AlertTransition::Resolved(event) => {
                    Counters::bump(&self.counters.alerts_resolved, 1);
                    self.events.publish(MonitoringEvent::AlertResolved(event.clone()));
                    AlertNotice::resolved(event.clone())
                }
            };
            self.dispatcher.dispatch(&notice, &actions);
            transitions.push(transition);
        }
        transitions
    }

    fn collect(&self) -> usize {
        Counters::bump(&self.counters.collection_runs, 1);
        let mut recorded = 0;
        if self.config.enable_system_monitoring {
            let mut collectors = self.collectors.lock();
            for collector in collectors.iter_mut() {
                match collector.collect() {
                    Ok(samples) => {
                        for sample in samples {
                            match self.store.set_gauge(&sample.name, sample.value, sample.labels) {
                                Ok(()) => recorded += 1,
                                Err(e) => tracing::warn!(
                                    collector = collector.name(),
                                    metric = %sample.name,
                                    error = %e,
                                    "Failed to record system metric"
                                ),
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(collector = collector.name(), error = %e, "Collector failed");
                        self.events.publish(MonitoringEvent::Error {
                            source: format!("collector:{}", collector.name()),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
        if self.config.enable_performance_monitoring {
            self.performance.publish_gauges();
        }
        match self.config.retention() {
            Some(retention) => {
                let removed = self.store.cleanup(retention);
                if removed > 0 {
                    tracing::debug!(removed, "Dropped expired data points");
                }
            }
            None => tracing::warn!(
                hours = self.config.data_retention_hours,
                "Retention window out of range, skipping cleanup"
            ),
        }
        recorded
    }
}

impl Drop for MonitoringService {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}
