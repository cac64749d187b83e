use crate::percentile::Percentiles;
use beacon_common::types::{Labels, Metric, MetricDataPoint, MetricType};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};

/// Mutable state of one metric. Always accessed behind its own lock.
pub(crate) struct MetricSeries {
    name: String,
    metric_type: MetricType,
    description: String,
    unit: String,
    points: VecDeque<MetricDataPoint>,
    last_value: f64,
    total_value: f64,
    count: u64,
    min: f64,
    max: f64,
    avg: f64,
    percentiles: BTreeMap<String, f64>,
}

impl MetricSeries {
    pub(crate) fn new(name: &str, metric_type: MetricType) -> Self {
        Self {
            name: name.to_string(),
            metric_type,
            description: String::new(),
            unit: String::new(),
            points: VecDeque::new(),
            last_value: 0.0,
            total_value: 0.0,
            count: 0,
            min: 0.0,
            max: 0.0,
            avg: 0.0,
            percentiles: BTreeMap::new(),
        }
    }

    pub(crate) fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    pub(crate) fn describe(&mut self, description: &str, unit: &str) {
        self.description = description.to_string();
        self.unit = unit.to_string();
    }

    pub(crate) fn len(&self) -> usize {
        self.points.len()
    }

    /// Latest observed value, `None` until the first observation.
    pub(crate) fn last_value(&self) -> Option<f64> {
        (self.count > 0).then_some(self.last_value)
    }

    pub(crate) fn append(&mut self, point: MetricDataPoint, max_points: usize) {
        let value = point.value;
        self.points.push_back(point);
        while self.points.len() > max_points.max(1) {
            self.points.pop_front();
        }

        self.last_value = value;
        self.total_value = match self.metric_type {
            MetricType::Counter => self.total_value + value,
            _ => value,
        };
        self.count += 1;
        self.recompute_window_stats();

        if self.metric_type.tracks_percentiles() {
            self.refresh_percentiles();
        }
    }

    /// Drop points older than `cutoff`. Returns how many were removed.
    pub(crate) fn evict_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.points.len();
        while self.points.front().is_some_and(|p| p.timestamp < cutoff) {
            self.points.pop_front();
        }
        let removed = before - self.points.len();
        if removed > 0 {
            self.recompute_window_stats();
            if self.metric_type.tracks_percentiles() {
                self.refresh_percentiles();
            }
        }
        removed
    }

    pub(crate) fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    fn recompute_window_stats(&mut self) {
        if self.points.is_empty() {
            self.min = 0.0;
            self.max = 0.0;
            self.avg = 0.0;
            return;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for p in &self.points {
            min = min.min(p.value);
            max = max.max(p.value);
            sum += p.value;
        }
        self.min = min;
        self.max = max;
        self.avg = sum / self.points.len() as f64;
    }

    fn refresh_percentiles(&mut self) {
        self.percentiles = Percentiles::compute(&self.values())
            .map(Percentiles::to_map)
            .unwrap_or_default();
    }

    pub(crate) fn snapshot(&self) -> Metric {
        self.snapshot_with(self.points.iter().cloned().collect())
    }

    /// Snapshot keeping only points inside `[start, end]` whose labels match,
    /// trimmed to the most recent `limit`.
    pub(crate) fn snapshot_filtered(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        labels: &Labels,
        limit: Option<usize>,
    ) -> Metric {
        let mut kept: Vec<MetricDataPoint> = self
            .points
            .iter()
            .filter(|p| start.map_or(true, |s| p.timestamp >= s))
            .filter(|p| end.map_or(true, |e| p.timestamp <= e))
            .filter(|p| p.matches_labels(labels))
            .cloned()
            .collect();
        if let Some(limit) = limit {
            if kept.len() > limit {
                kept.drain(..kept.len() - limit);
            }
        }
        self.snapshot_with(kept)
    }

    fn snapshot_with(&self, data_points: Vec<MetricDataPoint>) -> Metric {
        Metric {
            name: self.name.clone(),
            metric_type: self.metric_type,
            description: self.description.clone(),
            unit: self.unit.clone(),
            data_points,
            last_value: self.last_value,
            total_value: self.total_value,
            count: self.count,
            min: self.min,
            max: self.max,
            avg: self.avg,
            percentiles: self.percentiles.clone(),
        }
    }
}
