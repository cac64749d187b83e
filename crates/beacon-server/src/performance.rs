use beacon_common::types::Labels;
use beacon_storage::percentile::nearest_rank;
use beacon_storage::InMemoryStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

pub const MAX_REQUEST_SAMPLES: usize = 1000;

const DURATION_METRIC: &str = "http_request_duration_ms";
const REQUESTS_METRIC: &str = "http_requests_total";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ErrorRate {
    pub count: u64,
    pub total: u64,
    /// `count / total`, or 0 when no request has been seen.
    pub rate: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMetrics {
    pub request_count: u64,
    pub error_count: u64,
    pub avg_response_time_ms: f64,
    pub min_response_time_ms: f64,
    pub max_response_time_ms: f64,
    pub p50_response_time_ms: f64,
    pub p95_response_time_ms: f64,
    pub p99_response_time_ms: f64,
    pub requests_per_second: f64,
    pub requests_per_minute: f64,
    pub error_rate: ErrorRate,
    /// Number of request durations currently buffered.
    pub sample_count: usize,
}

#[derive(Default)]
struct Window {
    samples: VecDeque<(DateTime<Utc>, f64)>,
    request_count: u64,
    error_count: u64,
}

/// Request latency and throughput tracking for the embedding application.
pub struct PerformanceAggregator {
    window: Mutex<Window>,
    store: Arc<InMemoryStore>,
}

impl PerformanceAggregator {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self {
            window: Mutex::new(Window::default()),
            store,
        }
    }

    pub fn record_request_time(&self, duration_ms: f64, success: bool) {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            tracing::warn!(duration_ms, "Ignoring invalid request duration");
            return;
        }
        {
            let mut window = self.window.lock();
            window.samples.push_back((Utc::now(), duration_ms));
            while window.samples.len() > MAX_REQUEST_SAMPLES {
                window.samples.pop_front();
            }
            window.request_count += 1;
            if !success {
                window.error_count += 1;
            }
        }

        if let Err(e) = self.store.record_histogram(DURATION_METRIC, duration_ms, Labels::new()) {
            tracing::warn!(error = %e, "Failed to record request duration");
        }
        let mut labels = Labels::new();
        let status = if success { "success" } else { "error" };
        labels.insert("status".to_string(), status.to_string());
        if let Err(e) = self.store.increment_counter(REQUESTS_METRIC, 1.0, labels) {
            tracing::warn!(error = %e, "Failed to count request");
        }
    }

    pub fn snapshot(&self) -> PerformanceMetrics {
        let window = self.window.lock();
        let total = window.request_count;
        let error_rate = ErrorRate {
            count: window.error_count,
            total,
            rate: if total == 0 {
                0.0
            } else {
                window.error_count as f64 / total as f64
            },
        };

        let mut sorted: Vec<f64> = window.samples.iter().map(|(_, d)| *d).collect();
        if sorted.is_empty() {
            return PerformanceMetrics {
                request_count: total,
                error_count: window.error_count,
                error_rate,
                ..Default::default()
            };
        }
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len();
        // Throughput over the span the buffer covers, never shorter than a second.
        let span_secs = match (window.samples.front(), window.samples.back()) {
            (Some((first, _)), Some((last, _))) => {
                ((*last - *first).num_milliseconds() as f64 / 1000.0).max(1.0)
            }
            _ => 1.0,
        };
        let rps = n as f64 / span_secs;

        PerformanceMetrics {
            request_count: total,
            error_count: window.error_count,
            avg_response_time_ms: sorted.iter().sum::<f64>() / n as f64,
            min_response_time_ms: sorted[0],
            max_response_time_ms: sorted[n - 1],
            p50_response_time_ms: nearest_rank(&sorted, 0.50).unwrap_or(0.0),
            p95_response_time_ms: nearest_rank(&sorted, 0.95).unwrap_or(0.0),
            p99_response_time_ms: nearest_rank(&sorted, 0.99).unwrap_or(0.0),
            requests_per_second: rps,
            requests_per_minute: rps * 60.0,
            error_rate,
            sample_count: n,
        }
    }

    /// Record the current snapshot as `performance.*` gauges.
    pub fn publish_gauges(&self) {
        let snapshot = self.snapshot();
        let gauges = [
            ("performance.requests_per_second", snapshot.requests_per_second),
            ("performance.error_rate", snapshot.error_rate.rate),
            ("performance.avg_response_time_ms", snapshot.avg_response_time_ms),
            ("performance.p95_response_time_ms", snapshot.p95_response_time_ms),
        ];
        for (name, value) in gauges {
            if let Err(e) = self.store.set_gauge(name, value, Labels::new()) {
                tracing::warn!(metric = name, error = %e, "Failed to publish performance gauge");
            }
        }
    }

    /// Clear counters and the sample buffer. Recorded metrics are kept.
    pub fn reset(&self) {
        *self.window.lock() = Window::default();
    }
}
