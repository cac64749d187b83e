use crate::error::{Result, StorageError};
use crate::percentile::Percentiles;
use crate::series::MetricSeries;
use crate::{MetricFilter, MetricReader, DEFAULT_MAX_DATA_POINTS};
use beacon_common::types::{Labels, Metric, MetricDataPoint, MetricType};
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

type SharedSeries = Arc<Mutex<MetricSeries>>;

/// Thread-safe store of named metric series.
///
/// The outer `RwLock` only guards the name → series map; each series has its
/// own `Mutex`, so a read-modify-write on one metric is atomic while writes
/// to different metrics proceed in parallel.
pub struct InMemoryStore {
    max_data_points: usize,
    series: RwLock<HashMap<String, SharedSeries>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DATA_POINTS)
    }
}

impl InMemoryStore {
    pub fn new(max_data_points: usize) -> Self {
        Self {
            max_data_points: max_data_points.max(1),
            series: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_data_points(&self) -> usize {
        self.max_data_points
    }

    /// Record an observation. Unseen names become gauges.
    pub fn record(&self, name: &str, value: f64, labels: Labels) -> Result<()> {
        self.record_as(name, value, labels, None)
    }

    /// Add `delta` to a counter, declaring `name` as a counter on first use.
    pub fn increment_counter(&self, name: &str, delta: f64, labels: Labels) -> Result<()> {
        if delta < 0.0 {
            return Err(StorageError::NegativeIncrement {
                name: name.to_string(),
                delta,
            });
        }
        self.record_as(name, delta, labels, Some(MetricType::Counter))
    }

    pub fn set_gauge(&self, name: &str, value: f64, labels: Labels) -> Result<()> {
        self.record_as(name, value, labels, Some(MetricType::Gauge))
    }

    pub fn record_histogram(&self, name: &str, value: f64, labels: Labels) -> Result<()> {
        self.record_as(name, value, labels, Some(MetricType::Histogram))
    }

    pub fn record_summary(&self, name: &str, value: f64, labels: Labels) -> Result<()> {
        self.record_as(name, value, labels, Some(MetricType::Summary))
    }

    /// Declare a metric ahead of its first observation. An existing metric
    /// keeps its type; only description and unit are updated.
    pub fn register(
        &self,
        name: &str,
        metric_type: MetricType,
        description: &str,
        unit: &str,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(StorageError::EmptyName);
        }
        self.with_series(name, metric_type, |series| series.describe(description, unit));
        Ok(())
    }

    fn record_as(
        &self,
        name: &str,
        value: f64,
        labels: Labels,
        declared: Option<MetricType>,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(StorageError::EmptyName);
        }
        if !value.is_finite() {
            return Err(StorageError::NonFiniteValue {
                name: name.to_string(),
                value,
            });
        }

        self.with_series(name, declared.unwrap_or(MetricType::Gauge), |series| {
            if let Some(declared) = declared {
                if declared != series.metric_type() {
                    tracing::trace!(
                        metric = name,
                        stored = %series.metric_type(),
                        requested = %declared,
                        "Metric type mismatch, keeping stored type"
                    );
                }
            }
            series.append(MetricDataPoint::new(value, labels), self.max_data_points);
        });
        Ok(())
    }

    /// Run `f` on the series for `name`, creating it with `metric_type` if
    /// absent. The map lock is held until `f` returns so a concurrent
    /// `reset` cannot orphan the write.
    fn with_series<R>(&self, name: &str, metric_type: MetricType, f: impl FnOnce(&mut MetricSeries) -> R) -> R {
        {
            let map = self.series.read();
            if let Some(series) = map.get(name) {
                return f(&mut series.lock());
            }
        }
        let mut map = self.series.write();
        let series = map
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(MetricSeries::new(name, metric_type))));
        let mut guard = series.lock();
        f(&mut guard)
    }

    fn lookup(&self, name: &str) -> Option<SharedSeries> {
        self.series.read().get(name).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Metric> {
        self.lookup(name).map(|s| s.lock().snapshot())
    }

    /// Snapshots of every metric, ordered by name.
    pub fn list(&self) -> Vec<Metric> {
        let mut all: Vec<(String, SharedSeries)> = self
            .series
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all.into_iter().map(|(_, s)| s.lock().snapshot()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.series.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Filtered snapshots, ordered by name. When the filter narrows data
    /// points, metrics left without any point are omitted.
    pub fn query(&self, filter: &MetricFilter) -> Result<Vec<Metric>> {
        filter.validate()?;

        let candidates: Vec<(String, SharedSeries)> = {
            let map = self.series.read();
            match &filter.names {
                Some(names) => names
                    .iter()
                    .filter_map(|n| map.get(n).map(|s| (n.clone(), s.clone())))
                    .collect(),
                None => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            }
        };

        let mut results: Vec<Metric> = candidates
            .into_iter()
            .map(|(_, series)| {
                series.lock().snapshot_filtered(
                    filter.start_time,
                    filter.end_time,
                    &filter.labels,
                    filter.limit,
                )
            })
            .filter(|m| !filter.filters_points() || !m.data_points.is_empty())
            .collect();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        results.dedup_by(|a, b| a.name == b.name);
        Ok(results)
    }

    /// Nearest-rank percentiles over a snapshot of the retained points.
    pub fn percentiles(&self, name: &str) -> Option<Percentiles> {
        let values = self.lookup(name)?.lock().values();
        Percentiles::compute(&values)
    }

    /// Clear one metric, or every metric when `name` is `None`. Returns the
    /// number of retained data points discarded.
    pub fn reset(&self, name: Option<&str>) -> Result<usize> {
        let mut map = self.series.write();
        match name {
            Some(name) => map
                .remove(name)
                .map(|series| series.lock().len())
                .ok_or_else(|| StorageError::MetricNotFound(name.to_string())),
            None => Ok(map.drain().map(|(_, series)| series.lock().len()).sum()),
        }
    }

    /// Drop data points older than `retention`. Returns the number removed.
    /// A non-positive or unrepresentable window removes nothing.
    pub fn cleanup(&self, retention: Duration) -> usize {
        if retention <= Duration::zero() {
            tracing::warn!(retention_secs = retention.num_seconds(), "Ignoring non-positive retention window");
            return 0;
        }
        match Utc::now().checked_sub_signed(retention) {
            Some(cutoff) => self.cleanup_before(cutoff),
            None => 0,
        }
    }

    pub fn cleanup_before(&self, cutoff: DateTime<Utc>) -> usize {
        let all: Vec<SharedSeries> = self.series.read().values().cloned().collect();
        all.iter().map(|s| s.lock().evict_before(cutoff)).sum()
    }

    /// Number of metrics currently stored.
    pub fn len(&self) -> usize {
        self.series.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.read().is_empty()
    }

    /// Retained data points across all metrics.
    pub fn total_points(&self) -> usize {
        let all: Vec<SharedSeries> = self.series.read().values().cloned().collect();
        all.iter().map(|s| s.lock().len()).sum()
    }
}

impl MetricReader for InMemoryStore {
    fn latest_value(&self, name: &str) -> Option<f64> {
        self.lookup(name)?.lock().last_value()
    }
}
