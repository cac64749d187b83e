use crate::config::{HealthCheckConfig, MonitoringConfig, RuleConfig, MAX_RETENTION_HOURS};
use crate::error::MonitorError;
use crate::events::{EventBus, MonitoringEvent};
use crate::performance::{PerformanceAggregator, MAX_REQUEST_SAMPLES};
use crate::rule_builder;
use crate::scheduler::{Job, Scheduler};
use beacon_alert::{AlertEngine, CompareOp};
use beacon_common::types::{AlertAction, HealthCheckResult, Severity};
use beacon_storage::{InMemoryStore, MetricReader};
use futures::FutureExt;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn counting_job(name: &'static str, period_secs: u64, counter: Arc<AtomicUsize>) -> Job {
    Job::new(name, Duration::from_secs(period_secs), move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    })
}

#[test]
fn empty_config_uses_defaults() {
    let config: MonitoringConfig = toml::from_str("").unwrap();
    assert_eq!(config.metrics_interval_secs, 30);
    assert_eq!(config.health_check_interval_secs, 60);
    assert_eq!(config.alert_check_interval_secs, 10);
    assert_eq!(config.data_retention_hours, 24);
    assert_eq!(config.max_data_points, 1000);
    assert!(config.enable_alerts);
    assert!(config.enable_performance_monitoring);
    assert!(config.enable_system_monitoring);
    assert_eq!(config.health_check_timeout_secs, 5);
    assert!(!config.alert_policy.resolve_on_disable);
    assert!(!config.alert_policy.enforce_duration);
    assert_eq!(config.logging.directive, "beacon=info");
    assert!(config.smtp.is_none());
    assert!(config.validate().is_ok());
}

#[test]
fn config_file_loads_checks_rules_and_policy() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
alert_check_interval_secs = 5
enable_system_monitoring = false

[alert_policy]
resolve_on_disable = true

[logging]
directive = "beacon=debug"
json = true

[[health_checks]]
type = "database"
name = "primary"
address = "127.0.0.1:5432"
connect_timeout_ms = 500

[[health_checks]]
type = "http"
name = "api"
url = "http://127.0.0.1:8080/health"
expected_status = 204

[[rules]]
id = "errors"
metric = "performance.error_rate"
operator = ">="
threshold = 0.05
severity = "critical"
actions = [{{ type = "log" }}, {{ type = "webhook", url = "http://hooks.local/alert" }}]
"#
    )
    .unwrap();

    let config = MonitoringConfig::load(file.path().to_str().unwrap()).unwrap();
    assert_eq!(config.alert_check_interval_secs, 5);
    assert!(!config.enable_system_monitoring);
    assert!(config.alert_policy.resolve_on_disable);
    assert!(config.logging.json);
    assert_eq!(config.health_checks.len(), 2);
    assert_eq!(config.health_checks[1].name(), "api");
    assert_eq!(config.rules.len(), 1);
    assert_eq!(config.rules[0].actions.len(), 2);
}

#[test]
fn config_rejects_zero_interval_and_duplicate_checks() {
    let config: MonitoringConfig = toml::from_str("metrics_interval_secs = 0").unwrap();
    assert!(config.validate().is_err());

    let config: MonitoringConfig = toml::from_str(
        r#"
[[health_checks]]
type = "redis"
name = "cache"
url = "redis://127.0.0.1/"

[[health_checks]]
type = "redis"
name = "cache"
url = "redis://127.0.0.1/1"
"#,
    )
    .unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn retention_hours_are_bounded() {
    for hours in [0, MAX_RETENTION_HOURS + 1, 10_000_000_000, u64::MAX] {
        let config = MonitoringConfig {
            data_retention_hours: hours,
            ..Default::default()
        };
        assert!(
            matches!(config.validate(), Err(MonitorError::InvalidConfig(_))),
            "{hours} hours should be rejected"
        );
    }

    let config = MonitoringConfig {
        data_retention_hours: MAX_RETENTION_HOURS,
        ..Default::default()
    };
    config.validate().unwrap();
    assert_eq!(
        config.retention(),
        Some(chrono::Duration::hours(MAX_RETENTION_HOURS as i64))
    );

    let unchecked = MonitoringConfig {
        data_retention_hours: u64::MAX,
        ..Default::default()
    };
    assert_eq!(unchecked.retention(), None);
}

#[test]
fn missing_config_file_is_an_error() {
    assert!(MonitoringConfig::load("/nonexistent/beacon.toml").is_err());
}

#[test]
fn shipped_example_config_is_valid() {
    let config: MonitoringConfig =
        toml::from_str(include_str!("../../../config/beacon.example.toml")).unwrap();
    config.validate().unwrap();
    assert_eq!(config.health_checks.len(), 3);
    assert_eq!(config.rules.len(), 2);
    for rule in &config.rules {
        rule_builder::build_rule(rule).unwrap();
    }
    assert_eq!(config.rules[1].actions.len(), 2);
}

fn rule_config(id: &str, operator: &str, severity: &str) -> RuleConfig {
    RuleConfig {
        id: id.to_string(),
        name: None,
        metric: "cpu".to_string(),
        operator: operator.to_string(),
        threshold: 90.0,
        severity: severity.to_string(),
        duration_secs: None,
        enabled: true,
        actions: vec![AlertAction::Log],
    }
}

#[test]
fn rule_builder_parses_operator_and_severity() {
    let rule = rule_builder::build_rule(&rule_config("cpu", "gt", "HIGH")).unwrap();
    assert_eq!(rule.condition.operator, CompareOp::GreaterThan);
    assert_eq!(rule.severity, Severity::High);
    assert_eq!(rule.name, "cpu");

    assert!(rule_builder::build_rule(&rule_config("bad-op", "~=", "high")).is_err());
    assert!(rule_builder::build_rule(&rule_config("bad-sev", ">", "urgent")).is_err());
}

#[test]
fn seed_rules_skips_invalid_and_duplicate_entries() {
    let mut engine = AlertEngine::default();
    let seeds = vec![
        rule_config("cpu", ">", "high"),
        rule_config("cpu", ">", "high"),
        rule_config("broken", "??", "high"),
        rule_config("", ">", "low"),
        rule_config("mem", "<=", "low"),
        RuleConfig {
            duration_secs: Some(u64::MAX),
            ..rule_config("forever", ">", "low")
        },
    ];
    assert_eq!(rule_builder::seed_rules(&mut engine, &seeds), 2);
    assert_eq!(engine.rules().len(), 2);
}

#[tokio::test]
async fn checker_builder_covers_builtin_kinds() {
    let database = rule_builder::build_checker(&HealthCheckConfig::Database {
        name: "db".into(),
        address: "127.0.0.1:5432".into(),
        connect_timeout_ms: Some(100),
        degraded_after_ms: None,
    })
    .unwrap();
    assert_eq!(database.name(), "db");

    let http = rule_builder::build_checker(&HealthCheckConfig::Http {
        name: "api".into(),
        url: "http://127.0.0.1:1/health".into(),
        timeout_ms: 200,
        expected_status: Some(200),
    })
    .unwrap();
    assert_eq!(http.name(), "api");

    assert!(rule_builder::build_checker(&HealthCheckConfig::Redis {
        name: "cache".into(),
        url: "definitely not a url".into(),
        degraded_after_ms: None,
    })
    .is_err());
}

#[test]
fn error_rate_is_zero_without_requests() {
    let perf = PerformanceAggregator::new(Arc::new(InMemoryStore::default()));
    let snapshot = perf.snapshot();
    assert_eq!(snapshot.request_count, 0);
    assert_eq!(snapshot.error_rate.rate, 0.0);
    assert_eq!(snapshot.requests_per_second, 0.0);
}

#[test]
fn error_rate_matches_failed_share() {
    let store = Arc::new(InMemoryStore::default());
    let perf = PerformanceAggregator::new(store.clone());
    for i in 0..40 {
        perf.record_request_time(10.0 + i as f64, i % 4 != 0);
    }

    let snapshot = perf.snapshot();
    assert_eq!(snapshot.request_count, 40);
    assert_eq!(snapshot.error_count, 10);
    assert_eq!(snapshot.error_rate.count, 10);
    assert_eq!(snapshot.error_rate.total, 40);
    assert!((snapshot.error_rate.rate - 0.25).abs() < 1e-12);

    assert_eq!(snapshot.min_response_time_ms, 10.0);
    assert_eq!(snapshot.max_response_time_ms, 49.0);
    assert_eq!(snapshot.p50_response_time_ms, 29.0);
    assert_eq!(snapshot.p95_response_time_ms, 47.0);
    assert!(snapshot.requests_per_second > 0.0);
    assert_eq!(snapshot.requests_per_minute, snapshot.requests_per_second * 60.0);

    let histogram = store.get("http_request_duration_ms").unwrap();
    assert_eq!(histogram.count, 40);
    assert_eq!(store.get("http_requests_total").unwrap().total_value, 40.0);
}

#[test]
fn request_buffer_is_bounded_but_counters_are_not() {
    let perf = PerformanceAggregator::new(Arc::new(InMemoryStore::default()));
    for _ in 0..(MAX_REQUEST_SAMPLES + 250) {
        perf.record_request_time(5.0, true);
    }
    let snapshot = perf.snapshot();
    assert_eq!(snapshot.sample_count, MAX_REQUEST_SAMPLES);
    assert_eq!(snapshot.request_count, (MAX_REQUEST_SAMPLES + 250) as u64);

    perf.record_request_time(f64::NAN, true);
    perf.record_request_time(-1.0, false);
    assert_eq!(perf.snapshot().request_count, (MAX_REQUEST_SAMPLES + 250) as u64);

    perf.reset();
    let snapshot = perf.snapshot();
    assert_eq!(snapshot.request_count, 0);
    assert_eq!(snapshot.sample_count, 0);
}

#[test]
fn performance_gauges_land_in_store() {
    let store = Arc::new(InMemoryStore::default());
    let perf = PerformanceAggregator::new(store.clone());
    perf.record_request_time(20.0, false);
    perf.record_request_time(30.0, true);
    perf.publish_gauges();
    assert_eq!(store.latest_value("performance.error_rate"), Some(0.5));
    assert_eq!(store.latest_value("performance.avg_response_time_ms"), Some(25.0));
}

#[tokio::test]
async fn every_subscriber_sees_every_event() {
    let bus = EventBus::new();
    let mut first = bus.subscribe();
    let mut second = bus.subscribe();

    for i in 0..3 {
        bus.publish(MonitoringEvent::HealthCheck(HealthCheckResult::healthy(
            &format!("check-{i}"),
            "ok",
        )));
    }

    for rx in [&mut first, &mut second] {
        for i in 0..3 {
            match rx.recv().await.unwrap() {
                MonitoringEvent::HealthCheck(result) => assert_eq!(result.name, format!("check-{i}")),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }
}

#[tokio::test]
async fn closed_subscribers_are_pruned() {
    let bus = EventBus::new();
    let _kept = bus.subscribe();
    let dropped = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 2);

    drop(dropped);
    bus.publish(MonitoringEvent::Error {
        source: "test".into(),
        message: "boom".into(),
    });
    assert_eq!(bus.subscriber_count(), 1);
}

#[test]
fn events_serialize_with_type_tag() {
    let json = serde_json::to_value(MonitoringEvent::Error {
        source: "metrics".into(),
        message: "bad value".into(),
    })
    .unwrap();
    assert_eq!(json["type"], "error");
    assert_eq!(json["payload"]["source"], "metrics");
}

#[tokio::test(start_paused = true)]
async fn scheduler_ticks_until_stopped() {
    let scheduler = Scheduler::new();
    let fast = Arc::new(AtomicUsize::new(0));
    let slow = Arc::new(AtomicUsize::new(0));
    assert!(scheduler
        .start(vec![
            counting_job("fast", 10, fast.clone()),
            counting_job("slow", 60, slow.clone()),
        ])
        .unwrap());
    assert!(!scheduler.start(vec![counting_job("extra", 1, fast.clone())]).unwrap());
    assert_eq!(scheduler.active_tasks().len(), 2);

    tokio::time::sleep(Duration::from_secs(35)).await;
    let fast_ticks = fast.load(Ordering::SeqCst);
    assert!((3..=4).contains(&fast_ticks), "fast ticked {fast_ticks} times");
    assert_eq!(slow.load(Ordering::SeqCst), 1);

    assert_eq!(scheduler.stop(), 2);
    assert_eq!(scheduler.stop(), 0);
    assert!(scheduler.active_tasks().is_empty());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(fast.load(Ordering::SeqCst), fast_ticks);
}

#[tokio::test(start_paused = true)]
async fn failing_and_panicking_ticks_keep_loop_alive() {
    let scheduler = Scheduler::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let failing = attempts.clone();
    let panics = Arc::new(AtomicUsize::new(0));
    let panicking = panics.clone();

    scheduler
        .start(vec![
            Job::new("failing", Duration::from_secs(10), move || {
                let failing = failing.clone();
                async move {
                    failing.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow::anyhow!("tick failed"))
                }
                .boxed()
            }),
            Job::new("panicking", Duration::from_secs(10), move || {
                let panicking = panicking.clone();
                async move {
                    panicking.fetch_add(1, Ordering::SeqCst);
                    panic!("tick bug");
                }
                .boxed()
            }),
        ])
        .unwrap();

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert!(attempts.load(Ordering::SeqCst) >= 3);
    assert!(panics.load(Ordering::SeqCst) >= 3);
    assert_eq!(scheduler.active_tasks().len(), 2);
    scheduler.stop();
}

#[test]
fn scheduler_needs_a_runtime() {
    let scheduler = Scheduler::new();
    let counter = Arc::new(AtomicUsize::new(0));
    assert!(scheduler.start(vec![counting_job("c", 1, counter)]).is_err());
}
